use async_trait::async_trait;
use bugzot_core::AppResult;
use bugzot_domain::{Attachment, AttachmentId, AttachmentUpload, BugId, NewAuditEntry, UserId};

use super::Committed;

/// Attachment metadata storage.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Finds attachment metadata, soft-deleted ones included.
    async fn find_attachment(&self, attachment_id: AttachmentId)
    -> AppResult<Option<Attachment>>;

    /// Lists live attachments of a bug. Without `include_history` only the
    /// latest version of each file name is returned.
    async fn list_attachments(
        &self,
        bug_id: BugId,
        include_history: bool,
    ) -> AppResult<Vec<Attachment>>;

    /// Records a new version of a file name on a bug.
    ///
    /// The version number is one above the highest existing version of the
    /// name, and previous versions lose their latest flag.
    async fn create_attachment(
        &self,
        attachment_id: AttachmentId,
        bug_id: BugId,
        uploader_id: UserId,
        upload: AttachmentUpload,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Attachment>>;

    /// Soft-deletes a version. When it was the latest, the newest remaining
    /// version of the same name becomes latest.
    async fn soft_delete_attachment(
        &self,
        attachment_id: AttachmentId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Attachment>>;
}
