use bugzot_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProductId;

/// Maximum product name length.
pub const PRODUCT_NAME_MAX_LENGTH: usize = 120;

/// A tracked product. Bugs always belong to exactly one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable identifier.
    pub id: ProductId,
    /// Unique display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Whether new bugs may be filed.
    pub is_active: bool,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    name: NonEmptyString,
    description: Option<String>,
}

impl NewProduct {
    /// Validates a product name and optional description.
    pub fn new(name: impl Into<String>, description: Option<String>) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        if name.as_str().chars().count() > PRODUCT_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "product name must not exceed {PRODUCT_NAME_MAX_LENGTH} characters"
            )));
        }

        let description = description
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        Ok(Self { name, description })
    }

    /// Returns the validated name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the normalized description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
