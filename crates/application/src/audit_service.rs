use std::sync::Arc;

use bugzot_core::{AppError, AppResult};
use bugzot_domain::{Actor, AuditEntry, NewAuditEntry, ResourceTarget};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::{AuditQuery, AuditRepository, AuthorizationService};

/// Largest page returned by one audit query.
pub const AUDIT_PAGE_MAX: usize = 500;

/// Default page size when the caller does not choose one.
pub const AUDIT_PAGE_DEFAULT: usize = 100;

/// One page of audit entries with the cursor for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPage {
    /// Entries in ascending sequence order.
    pub entries: Vec<AuditEntry>,
    /// Cursor to pass as `after_sequence`; `None` when the log is exhausted.
    pub next_after: Option<i64>,
}

/// Records and reads the audit trail.
#[derive(Clone)]
pub struct AuditService {
    repository: Arc<dyn AuditRepository>,
    authorization_service: AuthorizationService,
}

impl AuditService {
    /// Creates a new audit service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AuditRepository>,
        authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            authorization_service,
        }
    }

    /// Appends an entry that does not accompany a database mutation.
    pub async fn record_audit(&self, entry: NewAuditEntry) -> AppResult<i64> {
        self.repository.append_entry(entry).await
    }

    /// Returns one page of entries for an administrator.
    pub async fn query_page(&self, actor: &Actor, mut query: AuditQuery) -> AppResult<AuditPage> {
        self.authorization_service
            .require_read(actor, &ResourceTarget::audit_log())
            .await?;

        query.limit = clamp_limit(query.limit);
        let entries = self.repository.list_entries(&query).await?;
        let next_after = if entries.len() == query.limit {
            entries.last().map(|entry| entry.sequence)
        } else {
            None
        };

        Ok(AuditPage {
            entries,
            next_after,
        })
    }

    /// Streams entries for an administrator.
    pub async fn query_audit_for(
        &self,
        actor: &Actor,
        query: AuditQuery,
    ) -> AppResult<BoxStream<'static, AppResult<AuditEntry>>> {
        self.authorization_service
            .require_read(actor, &ResourceTarget::audit_log())
            .await?;

        Ok(self.query_audit(query))
    }

    /// Lazily streams matching entries in sequence order.
    ///
    /// Pages of `query.limit` entries are fetched on demand, each page
    /// resuming after the last sequence seen. Starting from any
    /// `after_sequence` cursor restarts the stream at that point. The stream
    /// ends at the current tail of the log.
    pub fn query_audit(&self, mut query: AuditQuery) -> BoxStream<'static, AppResult<AuditEntry>> {
        query.limit = clamp_limit(query.limit);
        let repository = Arc::clone(&self.repository);

        stream::try_unfold(Some(query), move |state| {
            let repository = Arc::clone(&repository);
            async move {
                let Some(mut query) = state else {
                    return Ok::<_, AppError>(None);
                };

                let entries = repository.list_entries(&query).await?;
                let Some(last) = entries.last().map(|entry| entry.sequence) else {
                    return Ok(None);
                };

                let next_state = if entries.len() < query.limit {
                    None
                } else {
                    query.after_sequence = Some(last);
                    Some(query)
                };

                let page = stream::iter(entries.into_iter().map(Ok::<_, AppError>));
                Ok(Some((page, next_state)))
            }
        })
        .try_flatten()
        .boxed()
    }
}

fn clamp_limit(limit: usize) -> usize {
    if limit == 0 {
        return AUDIT_PAGE_DEFAULT;
    }

    limit.clamp(1, AUDIT_PAGE_MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bugzot_core::AppError;
    use bugzot_domain::{
        AccessDecision, Action, Actor, AuditAction, DecisionReason, NewAuditEntry, ResourceKind,
        Role, UserId,
    };
    use futures::TryStreamExt;
    use uuid::Uuid;

    use super::{AUDIT_PAGE_MAX, AuditService};
    use crate::test_support::FakeAuditRepository;
    use crate::{AuditQuery, AuthorizationService};

    fn service(repository: Arc<FakeAuditRepository>) -> AuditService {
        AuditService::new(repository.clone(), AuthorizationService::new(repository))
    }

    fn bug_entry(actor_id: UserId, bug_id: Uuid, action: AuditAction) -> NewAuditEntry {
        NewAuditEntry::mutation(
            actor_id,
            action,
            ResourceKind::Bug,
            bug_id,
            AccessDecision::Allow(DecisionReason::RoleSufficient),
        )
    }

    #[tokio::test]
    async fn stream_pages_through_every_matching_entry() {
        let repository = Arc::new(FakeAuditRepository::default());
        let service = service(repository.clone());
        let actor_id = UserId::new();
        let bug_id = Uuid::new_v4();

        for index in 0..7 {
            let target = if index % 2 == 0 { bug_id } else { Uuid::new_v4() };
            let recorded = service
                .record_audit(bug_entry(actor_id, target, AuditAction::BugUpdated))
                .await;
            assert!(recorded.is_ok());
        }

        let query = AuditQuery {
            target_id: Some(bug_id),
            limit: 2,
            ..AuditQuery::default()
        };
        let entries: Vec<_> = service
            .query_audit(query)
            .try_collect()
            .await
            .unwrap_or_default();

        assert_eq!(entries.len(), 4);
        assert!(entries.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
        assert!(entries.iter().all(|entry| entry.target_id == Some(bug_id)));
    }

    #[tokio::test]
    async fn stream_restarts_from_cursor() {
        let repository = Arc::new(FakeAuditRepository::default());
        let service = service(repository.clone());
        let actor_id = UserId::new();
        let bug_id = Uuid::new_v4();

        for _ in 0..5 {
            let recorded = service
                .record_audit(bug_entry(actor_id, bug_id, AuditAction::BugUpdated))
                .await;
            assert!(recorded.is_ok());
        }

        let all: Vec<_> = service
            .query_audit(AuditQuery::default())
            .try_collect()
            .await
            .unwrap_or_default();
        let cursor = all[1].sequence;

        let resumed: Vec<_> = service
            .query_audit(AuditQuery {
                after_sequence: Some(cursor),
                limit: 2,
                ..AuditQuery::default()
            })
            .try_collect()
            .await
            .unwrap_or_default();

        assert_eq!(resumed, all[2..].to_vec());
    }

    #[tokio::test]
    async fn page_requires_admin() {
        let repository = Arc::new(FakeAuditRepository::default());
        let service = service(repository);
        let maintainer = Actor::new(UserId::new(), Role::Maintainer, Vec::new());

        let page = service.query_page(&maintainer, AuditQuery::default()).await;
        assert!(matches!(page, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn page_limit_is_clamped_and_cursor_reported() {
        let repository = Arc::new(FakeAuditRepository::default());
        let service = service(repository.clone());
        let admin = Actor::new(UserId::new(), Role::Admin, Vec::new());

        let page = service
            .query_page(
                &admin,
                AuditQuery {
                    limit: AUDIT_PAGE_MAX * 10,
                    action: Some(Action::Read.as_str().to_owned()),
                    ..AuditQuery::default()
                },
            )
            .await;

        let page = page.map_err(|error| error.to_string());
        assert!(page.is_ok());
        assert_eq!(page.map(|page| page.next_after).unwrap_or(Some(-1)), None);
        assert_eq!(repository.last_limit().await, Some(AUDIT_PAGE_MAX));
    }
}
