use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use bugzot_application::{AuthRateLimits, RateLimitRule};
use bugzot_core::{AppError, AppResult};
use bugzot_infrastructure::JWT_SECRET_MIN_LENGTH;
use tracing_subscriber::EnvFilter;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

/// Where authoritative state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Validation(format!(
                "STORAGE_BACKEND must be either 'postgres' or 'memory', got '{other}'"
            ))),
        }
    }
}

/// First administrator created at startup when missing.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub actor_cache_ttl_seconds: u64,
    pub rate_limits: AuthRateLimits,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ApiConfig {
    pub fn load() -> AppResult<Self> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let storage_backend = optional("STORAGE_BACKEND")
            .map(|value| value.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::Postgres);

        let database_url = optional("DATABASE_URL");
        if database_url.is_none() && (migrate_only || storage_backend == StorageBackend::Postgres)
        {
            return Err(AppError::Validation("DATABASE_URL is required".to_owned()));
        }

        let jwt_secret =
            optional("JWT_SECRET").ok_or_else(|| AppError::Validation("JWT_SECRET is required".to_owned()))?;
        if jwt_secret.len() < JWT_SECRET_MIN_LENGTH {
            return Err(AppError::Validation(format!(
                "JWT_SECRET must be at least {JWT_SECRET_MIN_LENGTH} characters"
            )));
        }

        let jwt_ttl_minutes = parse_or("JWT_TTL_MINUTES", optional("JWT_TTL_MINUTES"), 30_i64)?;
        if jwt_ttl_minutes <= 0 {
            return Err(AppError::Validation(
                "JWT_TTL_MINUTES must be positive".to_owned(),
            ));
        }

        let api_host = optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or("API_PORT", optional("API_PORT"), 3001_u16)?;
        let frontend_url =
            optional("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_owned());
        let actor_cache_ttl_seconds = parse_or(
            "ACTOR_CACHE_TTL_SECONDS",
            optional("ACTOR_CACHE_TTL_SECONDS"),
            30_u64,
        )?;

        let rate_limits = AuthRateLimits {
            login: optional("LOGIN_RATE_LIMIT")
                .map(|value| RateLimitRule::parse("login", &value))
                .transpose()?
                .unwrap_or_else(RateLimitRule::login_default),
            register: optional("REGISTER_RATE_LIMIT")
                .map(|value| RateLimitRule::parse("register", &value))
                .transpose()?
                .unwrap_or_else(RateLimitRule::register_default),
        };

        let bootstrap_admin = match (
            optional("BOOTSTRAP_ADMIN_EMAIL"),
            optional("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together"
                        .to_owned(),
                ));
            }
        };

        Ok(Self {
            migrate_only,
            storage_backend,
            database_url,
            redis_url: optional("REDIS_URL"),
            jwt_secret,
            jwt_ttl_minutes,
            api_host,
            api_port,
            frontend_url,
            actor_cache_ttl_seconds,
            rate_limits,
            bootstrap_admin,
        })
    }

    pub fn socket_address(&self) -> AppResult<SocketAddr> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T: FromStr>(name: &str, value: Option<String>, default: T) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}
