//! HS256 JWT access token codec.

use bugzot_application::{IssuedToken, TokenClaims, TokenCodec};
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{Role, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum accepted signing secret length in bytes.
pub const JWT_SECRET_MIN_LENGTH: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    jti: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies access tokens with a shared HS256 secret.
#[derive(Clone)]
pub struct JwtTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtTokenCodec {
    /// Creates a codec from a secret of at least [`JWT_SECRET_MIN_LENGTH`] bytes.
    pub fn new(secret: &str, ttl_minutes: i64) -> AppResult<Self> {
        if secret.len() < JWT_SECRET_MIN_LENGTH {
            return Err(AppError::Validation(format!(
                "JWT secret must be at least {JWT_SECRET_MIN_LENGTH} bytes"
            )));
        }

        if ttl_minutes <= 0 {
            return Err(AppError::Validation(
                "JWT lifetime must be greater than zero minutes".to_owned(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        })
    }
}

impl TokenCodec for JwtTokenCodec {
    fn issue(&self, user_id: UserId, role: Role) -> AppResult<IssuedToken> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.ttl;
        let claims = TokenClaims {
            user_id,
            role,
            token_id: Uuid::new_v4().to_string(),
            issued_at,
            expires_at,
        };

        let encoded = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_owned(),
            jti: claims.token_id.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &encoded, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign access token: {error}")))?;

        Ok(IssuedToken { token, claims })
    }

    fn decode(&self, token: &str) -> AppResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|error| AppError::Unauthenticated(format!("invalid access token: {error}")))?;
        let claims = data.claims;

        let user_id = Uuid::parse_str(&claims.sub)
            .map(UserId::from_uuid)
            .map_err(|_| AppError::Unauthenticated("invalid token subject".to_owned()))?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| AppError::Unauthenticated("invalid token role".to_owned()))?;

        Ok(TokenClaims {
            user_id,
            role,
            token_id: claims.jti,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
        })
    }
}

fn timestamp(seconds: i64) -> AppResult<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| AppError::Unauthenticated("invalid token timestamp".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a-test-secret-that-is-long-enough-for-hs256";

    fn codec() -> JwtTokenCodec {
        JwtTokenCodec::new(SECRET, 30).unwrap_or_else(|_| panic!("codec should build"))
    }

    #[test]
    fn issued_token_decodes_to_same_claims() -> AppResult<()> {
        let codec = codec();
        let user_id = UserId::new();
        let issued = codec.issue(user_id, Role::Maintainer)?;

        let claims = codec.decode(&issued.token)?;
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, Role::Maintainer);
        assert_eq!(claims.token_id, issued.claims.token_id);
        assert_eq!(claims.expires_at.timestamp(), issued.claims.expires_at.timestamp());
        Ok(())
    }

    #[test]
    fn every_token_gets_a_fresh_id() -> AppResult<()> {
        let codec = codec();
        let user_id = UserId::new();
        let first = codec.issue(user_id, Role::Reporter)?;
        let second = codec.issue(user_id, Role::Reporter)?;
        assert_ne!(first.claims.token_id, second.claims.token_id);
        Ok(())
    }

    #[test]
    fn token_signed_with_other_secret_is_unauthenticated() -> AppResult<()> {
        let other = JwtTokenCodec::new("another-secret-that-is-long-enough-too!!", 30)?;
        let issued = other.issue(UserId::new(), Role::Admin)?;

        assert!(matches!(
            codec().decode(&issued.token),
            Err(AppError::Unauthenticated(_))
        ));
        Ok(())
    }

    #[test]
    fn expired_token_is_unauthenticated() -> AppResult<()> {
        let past = Utc::now() - Duration::minutes(5);
        let claims = Claims {
            sub: UserId::new().to_string(),
            role: "reporter".to_owned(),
            jti: Uuid::new_v4().to_string(),
            iat: (past - Duration::minutes(30)).timestamp(),
            exp: past.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .map_err(|error| AppError::Internal(error.to_string()))?;

        assert!(matches!(
            codec().decode(&token),
            Err(AppError::Unauthenticated(_))
        ));
        Ok(())
    }

    #[test]
    fn garbage_is_unauthenticated() {
        assert!(matches!(
            codec().decode("not.a.jwt"),
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(JwtTokenCodec::new("short", 30).is_err());
    }
}
