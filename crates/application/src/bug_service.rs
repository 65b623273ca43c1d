use std::sync::Arc;

use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    Action, Actor, AuditAction, Bug, BugId, BugPriority, BugStatus, NewAuditEntry, ProductId,
    ResourceKind, ResourceTarget, UserId, validate_bug_title,
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AuthorizationService, BugChanges, BugListQuery, BugRepository, ProductRepository,
    UserRepository,
};

/// Largest bug listing page.
pub const BUG_PAGE_MAX: usize = 200;

/// Input for filing a bug.
#[derive(Debug, Clone, Default)]
pub struct NewBugParams {
    /// Short summary.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Priority; defaults to medium.
    pub priority: Option<BugPriority>,
    /// Initial assignee.
    pub assignee_id: Option<UserId>,
}

/// Application service for bugs and their workflow.
#[derive(Clone)]
pub struct BugService {
    bug_repository: Arc<dyn BugRepository>,
    product_repository: Arc<dyn ProductRepository>,
    user_repository: Arc<dyn UserRepository>,
    authorization_service: AuthorizationService,
}

impl BugService {
    /// Creates a new bug service.
    #[must_use]
    pub fn new(
        bug_repository: Arc<dyn BugRepository>,
        product_repository: Arc<dyn ProductRepository>,
        user_repository: Arc<dyn UserRepository>,
        authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            bug_repository,
            product_repository,
            user_repository,
            authorization_service,
        }
    }

    /// Files a bug against an active product. The bug starts `Open`.
    pub async fn create_bug(
        &self,
        actor: &Actor,
        product_id: ProductId,
        params: NewBugParams,
    ) -> AppResult<Bug> {
        let product = self
            .product_repository
            .find_product(product_id)
            .await?
            .filter(|product| !product.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("product '{product_id}' not found")))?;

        let decision = self
            .authorization_service
            .require(actor, Action::Create, &ResourceTarget::bugs_of(product_id))
            .await?;

        if !product.is_active {
            return Err(AppError::Conflict(format!(
                "product '{}' is not accepting new bugs",
                product.name
            )));
        }

        let title = validate_bug_title(params.title)?;
        if let Some(assignee_id) = params.assignee_id {
            self.ensure_assignable(assignee_id).await?;
        }

        let now = Utc::now();
        let bug = Bug {
            id: BugId::new(),
            product_id,
            reporter_id: actor.user_id(),
            assignee_id: params.assignee_id,
            title,
            description: params.description.trim().to_owned(),
            status: BugStatus::Open,
            priority: params.priority.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::BugCreated,
            ResourceKind::Bug,
            bug.id.as_uuid(),
            decision,
        )
        .with_detail(json!({
            "product_id": product_id,
            "priority": bug.priority.as_str(),
        }));

        let committed = self.bug_repository.create_bug(bug, audit).await?;

        info!(
            actor_id = %actor.user_id(),
            bug_id = %committed.value.id,
            product_id = %product_id,
            audit_sequence = committed.audit_sequence,
            "bug created"
        );

        Ok(committed.value)
    }

    /// Returns one bug.
    pub async fn get_bug(&self, actor: &Actor, bug_id: BugId) -> AppResult<Bug> {
        let bug = self.load_bug(bug_id).await?;
        self.authorization_service
            .require_read(actor, &ResourceTarget::bug(&bug))
            .await?;

        Ok(bug)
    }

    /// Lists bugs of a product, newest first.
    pub async fn list_bugs(
        &self,
        actor: &Actor,
        product_id: ProductId,
        query: BugListQuery,
    ) -> AppResult<Vec<Bug>> {
        self.product_repository
            .find_product(product_id)
            .await?
            .filter(|product| !product.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("product '{product_id}' not found")))?;

        self.authorization_service
            .require_read(actor, &ResourceTarget::bugs_of(product_id))
            .await?;

        self.bug_repository
            .list_bugs(
                product_id,
                BugListQuery {
                    limit: query.limit.clamp(1, BUG_PAGE_MAX),
                    ..query
                },
            )
            .await
    }

    /// Edits title, description, priority or assignee.
    ///
    /// Maintainers may edit any bug of their product; reporters only their own.
    pub async fn update_bug(
        &self,
        actor: &Actor,
        bug_id: BugId,
        changes: BugChanges,
    ) -> AppResult<Bug> {
        let bug = self.load_bug(bug_id).await?;
        let decision = self
            .authorization_service
            .require(actor, Action::Update, &ResourceTarget::bug(&bug))
            .await?;

        if changes.is_empty() {
            return Err(AppError::Validation(
                "bug update must change at least one field".to_owned(),
            ));
        }

        if let Some(Some(assignee_id)) = changes.assignee_id {
            self.ensure_assignable(assignee_id).await?;
        }
        let changes = BugChanges {
            title: changes.title.map(validate_bug_title).transpose()?,
            description: changes
                .description
                .map(|description| description.trim().to_owned()),
            priority: changes.priority,
            assignee_id: changes.assignee_id,
        };

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::BugUpdated,
            ResourceKind::Bug,
            bug_id.as_uuid(),
            decision,
        )
        .with_detail(json!({ "fields": changed_fields(&changes) }));

        let committed = self
            .bug_repository
            .update_bug(bug_id, changes, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            bug_id = %bug_id,
            audit_sequence = committed.audit_sequence,
            "bug updated"
        );

        Ok(committed.value)
    }

    /// Moves a bug along the workflow graph.
    ///
    /// The edge is validated by the repository against the locked current
    /// status; an edge outside the graph fails with `InvalidTransition`
    /// whatever the actor's role.
    pub async fn transition_status(
        &self,
        actor: &Actor,
        bug_id: BugId,
        next: BugStatus,
    ) -> AppResult<Bug> {
        let bug = self.load_bug(bug_id).await?;
        let decision = self
            .authorization_service
            .require(actor, Action::TransitionStatus, &ResourceTarget::bug(&bug))
            .await?;

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::BugStatusChanged,
            ResourceKind::Bug,
            bug_id.as_uuid(),
            decision,
        );

        let committed = self
            .bug_repository
            .transition_status(bug_id, next, audit)
            .await
            .inspect_err(|error| {
                if let AppError::InvalidTransition(_) = error {
                    warn!(
                        actor_id = %actor.user_id(),
                        bug_id = %bug_id,
                        to = next.as_str(),
                        error = %error,
                        "bug status transition rejected"
                    );
                }
            })?;

        info!(
            actor_id = %actor.user_id(),
            bug_id = %bug_id,
            status = committed.value.status.as_str(),
            audit_sequence = committed.audit_sequence,
            "bug status changed"
        );

        Ok(committed.value)
    }

    /// Deletes a bug together with its comments and attachment metadata.
    pub async fn delete_bug(&self, actor: &Actor, bug_id: BugId) -> AppResult<()> {
        let bug = self.load_bug(bug_id).await?;
        let decision = self
            .authorization_service
            .require(actor, Action::Delete, &ResourceTarget::bug(&bug))
            .await?;

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::BugDeleted,
            ResourceKind::Bug,
            bug_id.as_uuid(),
            decision,
        )
        .with_detail(json!({
            "product_id": bug.product_id,
            "title": bug.title,
            "status": bug.status.as_str(),
        }));

        let committed = self.bug_repository.delete_bug(bug_id, audit).await?;

        info!(
            actor_id = %actor.user_id(),
            bug_id = %bug_id,
            audit_sequence = committed.audit_sequence,
            "bug deleted"
        );

        Ok(())
    }

    async fn load_bug(&self, bug_id: BugId) -> AppResult<Bug> {
        self.bug_repository
            .find_bug(bug_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bug '{bug_id}' not found")))
    }

    async fn ensure_assignable(&self, user_id: UserId) -> AppResult<()> {
        match self.user_repository.find_user(user_id).await? {
            Some(user) if user.is_active() => Ok(()),
            Some(_) => Err(AppError::Validation(format!(
                "user '{user_id}' is disabled and cannot be assigned"
            ))),
            None => Err(AppError::Validation(format!(
                "assignee '{user_id}' does not exist"
            ))),
        }
    }
}

fn changed_fields(changes: &BugChanges) -> Vec<&'static str> {
    [
        ("title", changes.title.is_some()),
        ("description", changes.description.is_some()),
        ("priority", changes.priority.is_some()),
        ("assignee_id", changes.assignee_id.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, changed)| changed.then_some(field))
    .collect()
}
