use crate::{AppError, AppResult};

const BEARER_PREFIX: &str = "Bearer ";

/// Raw bearer token extracted from an `Authorization` header.
///
/// The value is opaque at this layer; signature and expiry checks belong to
/// the identity service.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerCredential(String);

impl BearerCredential {
    /// Wraps an already extracted token value.
    pub fn new(token: impl Into<String>) -> AppResult<Self> {
        let token = token.into();
        if token.trim().is_empty() || token.chars().any(char::is_whitespace) {
            return Err(AppError::Unauthenticated(
                "missing or invalid token".to_owned(),
            ));
        }

        Ok(Self(token))
    }

    /// Parses the value of an `Authorization` header.
    pub fn from_authorization_header(header: Option<&str>) -> AppResult<Self> {
        let Some(header) = header else {
            return Err(AppError::Unauthenticated(
                "missing or invalid token".to_owned(),
            ));
        };

        let token = header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
            AppError::Unauthenticated("missing or invalid token".to_owned())
        })?;

        Self::new(token.trim())
    }

    /// Returns the raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

// Tokens must never reach logs through Debug formatting.
impl std::fmt::Debug for BearerCredential {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("BearerCredential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::BearerCredential;
    use crate::AppError;

    #[test]
    fn parses_bearer_header() {
        let credential = BearerCredential::from_authorization_header(Some("Bearer abc.def.ghi"));
        assert_eq!(
            credential.map(|value| value.as_str().to_owned()).unwrap_or_default(),
            "abc.def.ghi"
        );
    }

    #[test]
    fn missing_header_is_unauthenticated() {
        let result = BearerCredential::from_authorization_header(None);
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn other_schemes_are_unauthenticated() {
        let result = BearerCredential::from_authorization_header(Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn empty_token_is_unauthenticated() {
        let result = BearerCredential::from_authorization_header(Some("Bearer    "));
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn debug_output_is_redacted() {
        let credential = BearerCredential::new("secret-token");
        let formatted = credential
            .map(|value| format!("{value:?}"))
            .unwrap_or_default();
        assert!(!formatted.contains("secret-token"));
    }
}
