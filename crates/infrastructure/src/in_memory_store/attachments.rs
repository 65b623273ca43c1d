use async_trait::async_trait;
use bugzot_application::{AttachmentRepository, Committed};
use bugzot_domain::AttachmentUpload;

use super::*;

#[async_trait]
impl AttachmentRepository for InMemoryStore {
    async fn find_attachment(
        &self,
        attachment_id: AttachmentId,
    ) -> AppResult<Option<Attachment>> {
        Ok(self
            .state
            .read()
            .await
            .attachments
            .get(&attachment_id)
            .cloned())
    }

    async fn list_attachments(
        &self,
        bug_id: BugId,
        include_history: bool,
    ) -> AppResult<Vec<Attachment>> {
        let state = self.state.read().await;
        let mut attachments: Vec<Attachment> = state
            .attachments
            .values()
            .filter(|attachment| attachment.bug_id == bug_id && !attachment.is_deleted)
            .filter(|attachment| include_history || attachment.is_latest)
            .cloned()
            .collect();
        attachments.sort_by(|left, right| {
            left.filename
                .cmp(&right.filename)
                .then_with(|| right.version.cmp(&left.version))
        });
        Ok(attachments)
    }

    async fn create_attachment(
        &self,
        attachment_id: AttachmentId,
        bug_id: BugId,
        uploader_id: UserId,
        upload: AttachmentUpload,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Attachment>> {
        let mut state = self.state.write().await;
        state.require_bug(bug_id)?;

        let same_name = |attachment: &Attachment| {
            attachment.bug_id == bug_id && attachment.filename == upload.filename()
        };
        let version = state
            .attachments
            .values()
            .filter(|attachment| same_name(attachment))
            .map(|attachment| attachment.version)
            .max()
            .unwrap_or(0)
            + 1;

        let attachment = Attachment {
            id: attachment_id,
            bug_id,
            uploader_id,
            filename: upload.filename().to_owned(),
            storage_path: upload.storage_path().to_owned(),
            mime_type: upload.mime_type().map(str::to_owned),
            size_bytes: upload.size_bytes(),
            version,
            is_latest: true,
            is_deleted: false,
            uploaded_at: Utc::now(),
        };

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        for previous in state.attachments.values_mut() {
            if same_name(previous) {
                previous.is_latest = false;
            }
        }
        state.attachments.insert(attachment_id, attachment.clone());
        Ok(Committed::new(attachment, sequence))
    }

    async fn soft_delete_attachment(
        &self,
        attachment_id: AttachmentId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Attachment>> {
        let mut state = self.state.write().await;
        let mut attachment = state
            .attachments
            .get(&attachment_id)
            .filter(|attachment| !attachment.is_deleted)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("attachment '{attachment_id}' not found"))
            })?;
        let was_latest = attachment.is_latest;
        attachment.is_deleted = true;
        attachment.is_latest = false;

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.attachments.insert(attachment_id, attachment.clone());

        if was_latest
            && let Some(promoted) = state
                .attachments
                .values_mut()
                .filter(|other| {
                    other.bug_id == attachment.bug_id
                        && other.filename == attachment.filename
                        && !other.is_deleted
                })
                .max_by_key(|other| other.version)
        {
            promoted.is_latest = true;
        }

        Ok(Committed::new(attachment, sequence))
    }
}
