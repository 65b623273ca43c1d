use std::sync::Arc;

use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    Action, Actor, Attachment, AttachmentId, AttachmentUpload, AuditAction, Bug, BugId,
    NewAuditEntry, ResourceKind, ResourceTarget,
};
use serde_json::json;
use tracing::info;

use crate::{AttachmentRepository, AuthorizationService, BugRepository};

/// Application service for attachment metadata. File bytes live elsewhere;
/// only the caller-supplied storage path is recorded.
#[derive(Clone)]
pub struct AttachmentService {
    attachment_repository: Arc<dyn AttachmentRepository>,
    bug_repository: Arc<dyn BugRepository>,
    authorization_service: AuthorizationService,
}

impl AttachmentService {
    /// Creates a new attachment service.
    #[must_use]
    pub fn new(
        attachment_repository: Arc<dyn AttachmentRepository>,
        bug_repository: Arc<dyn BugRepository>,
        authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            attachment_repository,
            bug_repository,
            authorization_service,
        }
    }

    /// Records a new attachment version on a bug.
    pub async fn create_attachment(
        &self,
        actor: &Actor,
        bug_id: BugId,
        upload: AttachmentUpload,
    ) -> AppResult<Attachment> {
        let bug = self.load_bug(bug_id).await?;
        let decision = self
            .authorization_service
            .require(actor, Action::Create, &ResourceTarget::attachments_of(&bug))
            .await?;

        let attachment_id = AttachmentId::new();
        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::AttachmentCreated,
            ResourceKind::Attachment,
            attachment_id.as_uuid(),
            decision,
        )
        .with_detail(json!({
            "bug_id": bug_id,
            "filename": upload.filename(),
            "size_bytes": upload.size_bytes(),
        }));

        let committed = self
            .attachment_repository
            .create_attachment(attachment_id, bug_id, actor.user_id(), upload, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            bug_id = %bug_id,
            attachment_id = %attachment_id,
            version = committed.value.version,
            audit_sequence = committed.audit_sequence,
            "attachment recorded"
        );

        Ok(committed.value)
    }

    /// Lists attachments of a bug; older versions only with `include_history`.
    pub async fn list_attachments(
        &self,
        actor: &Actor,
        bug_id: BugId,
        include_history: bool,
    ) -> AppResult<Vec<Attachment>> {
        let bug = self.load_bug(bug_id).await?;
        self.authorization_service
            .require_read(actor, &ResourceTarget::attachments_of(&bug))
            .await?;

        self.attachment_repository
            .list_attachments(bug_id, include_history)
            .await
    }

    /// Returns metadata of one live attachment version.
    pub async fn get_attachment(
        &self,
        actor: &Actor,
        attachment_id: AttachmentId,
    ) -> AppResult<Attachment> {
        let (attachment, bug) = self.load_attachment(attachment_id).await?;
        self.authorization_service
            .require_read(actor, &ResourceTarget::attachment(&attachment, bug.product_id))
            .await?;

        Ok(attachment)
    }

    /// Soft-deletes one attachment version. Uploaders may delete their own.
    pub async fn delete_attachment(
        &self,
        actor: &Actor,
        attachment_id: AttachmentId,
    ) -> AppResult<()> {
        let (attachment, bug) = self.load_attachment(attachment_id).await?;
        let decision = self
            .authorization_service
            .require(
                actor,
                Action::Delete,
                &ResourceTarget::attachment(&attachment, bug.product_id),
            )
            .await?;

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::AttachmentDeleted,
            ResourceKind::Attachment,
            attachment_id.as_uuid(),
            decision,
        )
        .with_detail(json!({
            "bug_id": bug.id,
            "filename": attachment.filename,
            "version": attachment.version,
        }));

        let committed = self
            .attachment_repository
            .soft_delete_attachment(attachment_id, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            attachment_id = %attachment_id,
            audit_sequence = committed.audit_sequence,
            "attachment deleted"
        );

        Ok(())
    }

    async fn load_bug(&self, bug_id: BugId) -> AppResult<Bug> {
        self.bug_repository
            .find_bug(bug_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bug '{bug_id}' not found")))
    }

    async fn load_attachment(&self, attachment_id: AttachmentId) -> AppResult<(Attachment, Bug)> {
        let attachment = self
            .attachment_repository
            .find_attachment(attachment_id)
            .await?
            .filter(|attachment| !attachment.is_deleted)
            .ok_or_else(|| {
                AppError::NotFound(format!("attachment '{attachment_id}' not found"))
            })?;
        let bug = self.load_bug(attachment.bug_id).await?;

        Ok((attachment, bug))
    }
}
