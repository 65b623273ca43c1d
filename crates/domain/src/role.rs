use std::str::FromStr;

use bugzot_core::AppError;
use serde::{Deserialize, Serialize};

/// Global or per-product role, ordered from least to most privileged.
///
/// The derived ordering is the role hierarchy: `Viewer < Reporter <
/// Maintainer < Admin`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access to products the user belongs to.
    Viewer,
    /// May file bugs, comment publicly and upload attachments.
    #[default]
    Reporter,
    /// May triage bugs, drive the workflow and read private comments.
    Maintainer,
    /// Unrestricted access, including user and product administration.
    Admin,
}

impl Role {
    /// Returns a stable storage value for the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Reporter => "reporter",
            Self::Maintainer => "maintainer",
            Self::Admin => "admin",
        }
    }

    /// Returns all roles in ascending privilege order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[Role::Viewer, Role::Reporter, Role::Maintainer, Role::Admin];

        ALL
    }

    /// Returns a one-line summary of what the role may do.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Viewer => "Read-only access to member products",
            Self::Reporter => "Files bugs, comments publicly and uploads attachments",
            Self::Maintainer => "Triages bugs, drives the workflow and reads private comments",
            Self::Admin => "Administers users and products with unrestricted access",
        }
    }

    /// Returns the position in the hierarchy, starting at zero for `Viewer`.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Viewer => 0,
            Self::Reporter => 1,
            Self::Maintainer => 2,
            Self::Admin => 3,
        }
    }

    /// Returns whether this role meets the given minimum.
    #[must_use]
    pub fn satisfies(self, minimum: Role) -> bool {
        self >= minimum
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "viewer" => Ok(Self::Viewer),
            "reporter" => Ok(Self::Reporter),
            "maintainer" => Ok(Self::Maintainer),
            "admin" => Ok(Self::Admin),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Role;

    #[test]
    fn roles_are_totally_ordered() {
        assert!(Role::Viewer < Role::Reporter);
        assert!(Role::Reporter < Role::Maintainer);
        assert!(Role::Maintainer < Role::Admin);
    }

    #[test]
    fn default_role_is_reporter() {
        assert_eq!(Role::default(), Role::Reporter);
    }

    #[test]
    fn storage_values_parse_back() {
        for role in Role::all() {
            assert_eq!(Role::from_str(role.as_str()).ok(), Some(*role));
        }
    }

    #[test]
    fn ranks_follow_the_hierarchy() {
        let ranks: Vec<u8> = Role::all().iter().map(Role::rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(Role::all().iter().all(|role| !role.description().is_empty()));
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::from_str("superuser").is_err());
    }
}
