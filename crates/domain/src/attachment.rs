use bugzot_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AttachmentId, BugId, UserId};

/// Maximum attachment file name length.
pub const ATTACHMENT_FILENAME_MAX_LENGTH: usize = 255;

/// Metadata for a file attached to a bug. File bytes live elsewhere.
///
/// Re-uploading a file name on the same bug creates a new version; only the
/// newest version of each name carries `is_latest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Stable identifier.
    pub id: AttachmentId,
    /// Bug the file is attached to.
    pub bug_id: BugId,
    /// User who uploaded this version.
    pub uploader_id: UserId,
    /// Original file name.
    pub filename: String,
    /// Opaque storage location supplied by the uploader.
    pub storage_path: String,
    /// Declared MIME type.
    pub mime_type: Option<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Version number per bug and file name, starting at 1.
    pub version: i32,
    /// Whether this is the newest version of the file name.
    pub is_latest: bool,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

/// Validated attachment metadata supplied at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    filename: NonEmptyString,
    storage_path: NonEmptyString,
    mime_type: Option<String>,
    size_bytes: i64,
}

impl AttachmentUpload {
    /// Validates upload metadata.
    pub fn new(
        filename: impl Into<String>,
        storage_path: impl Into<String>,
        mime_type: Option<String>,
        size_bytes: i64,
    ) -> AppResult<Self> {
        let filename = NonEmptyString::new(filename)?;
        if filename.as_str().chars().count() > ATTACHMENT_FILENAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "attachment file name must not exceed {ATTACHMENT_FILENAME_MAX_LENGTH} characters"
            )));
        }

        if filename.as_str().contains(['/', '\\']) {
            return Err(AppError::Validation(
                "attachment file name must not contain path separators".to_owned(),
            ));
        }

        if size_bytes < 0 {
            return Err(AppError::Validation(
                "attachment size must not be negative".to_owned(),
            ));
        }

        let mime_type = mime_type
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        Ok(Self {
            filename,
            storage_path: NonEmptyString::new(storage_path)?,
            mime_type,
            size_bytes,
        })
    }

    /// Returns the file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        self.filename.as_str()
    }

    /// Returns the storage location.
    #[must_use]
    pub fn storage_path(&self) -> &str {
        self.storage_path.as_str()
    }

    /// Returns the normalized MIME type.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Returns the declared size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> i64 {
        self.size_bytes
    }
}
