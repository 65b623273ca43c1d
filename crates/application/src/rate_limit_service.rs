//! Fixed-window rate limiting for credential endpoints.
//!
//! Counts attempts per `"{category}:{client}"` key. Follows OWASP Credential
//! Stuffing Prevention recommendations for per-IP throttling.

mod config;
mod service;

pub use config::RateLimitRule;
pub use service::RateLimitService;
