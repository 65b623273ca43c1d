use std::str::FromStr;

use bugzot_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self).map_err(|_| {
                    AppError::Validation(format!("invalid {} id '{value}'", $label))
                })
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a user account.
    UserId,
    "user"
);
uuid_identifier!(
    /// Unique identifier for a product.
    ProductId,
    "product"
);
uuid_identifier!(
    /// Unique identifier for a bug.
    BugId,
    "bug"
);
uuid_identifier!(
    /// Unique identifier for a bug comment.
    CommentId,
    "comment"
);
uuid_identifier!(
    /// Unique identifier for attachment metadata.
    AttachmentId,
    "attachment"
);
