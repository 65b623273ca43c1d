use bugzot_domain::Bug;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::double_option;

/// Incoming payload for filing a bug.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-bug-request.ts"
)]
pub struct CreateBugRequest {
    pub title: String,
    pub description: String,
    pub priority: Option<String>,
    pub assignee_id: Option<String>,
}

/// Partial bug update; `assignee_id: null` unassigns.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-bug-request.ts"
)]
pub struct UpdateBugRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(type = "string | null | undefined")]
    pub assignee_id: Option<Option<String>>,
}

/// Incoming payload for a workflow transition.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/transition-status-request.ts"
)]
pub struct TransitionStatusRequest {
    pub status: String,
}

/// API representation of a bug.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/bug-response.ts"
)]
pub struct BugResponse {
    pub id: String,
    pub product_id: String,
    pub reporter_id: String,
    pub assignee_id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Bug> for BugResponse {
    fn from(value: Bug) -> Self {
        Self {
            id: value.id.to_string(),
            product_id: value.product_id.to_string(),
            reporter_id: value.reporter_id.to_string(),
            assignee_id: value.assignee_id.map(|user_id| user_id.to_string()),
            title: value.title,
            description: value.description,
            status: value.status.as_str().to_owned(),
            priority: value.priority.as_str().to_owned(),
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}
