use bugzot_application::AuditPage;
use bugzot_domain::AuditEntry;
use serde::Serialize;
use ts_rs::TS;

/// API representation of an audit entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-entry-response.ts"
)]
pub struct AuditEntryResponse {
    #[ts(type = "number")]
    pub sequence: i64,
    pub actor_id: Option<String>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<String>,
    pub decision: String,
    pub reason: String,
    #[ts(type = "unknown")]
    pub detail: Option<serde_json::Value>,
    pub recorded_at: String,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(value: AuditEntry) -> Self {
        Self {
            sequence: value.sequence,
            actor_id: value.actor_id.map(|actor_id| actor_id.to_string()),
            action: value.action,
            target_type: value.target_type.as_str().to_owned(),
            target_id: value.target_id.map(|target_id| target_id.to_string()),
            decision: value.decision.as_str().to_owned(),
            reason: value.reason,
            detail: value.detail,
            recorded_at: value.recorded_at.to_rfc3339(),
        }
    }
}

/// One page of the audit log plus the cursor for the next page.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-page-response.ts"
)]
pub struct AuditPageResponse {
    pub entries: Vec<AuditEntryResponse>,
    #[ts(type = "number | null")]
    pub next_after: Option<i64>,
}

impl From<AuditPage> for AuditPageResponse {
    fn from(value: AuditPage) -> Self {
        Self {
            entries: value
                .entries
                .into_iter()
                .map(AuditEntryResponse::from)
                .collect(),
            next_after: value.next_after,
        }
    }
}
