//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_actor_cache;
mod in_memory_rate_limit_repository;
mod in_memory_store;
mod in_memory_token_revocation_store;
mod jwt_token_codec;
mod postgres_attachment_repository;
mod postgres_audit_repository;
mod postgres_bug_repository;
mod postgres_comment_repository;
mod postgres_product_repository;
mod postgres_rate_limit_repository;
mod postgres_support;
#[cfg(test)]
mod postgres_test_support;
mod postgres_user_repository;
mod redis_actor_cache;
mod redis_rate_limit_repository;
mod redis_token_revocation_store;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_actor_cache::InMemoryActorCache;
pub use in_memory_rate_limit_repository::InMemoryRateLimitRepository;
pub use in_memory_store::InMemoryStore;
pub use in_memory_token_revocation_store::InMemoryTokenRevocationStore;
pub use jwt_token_codec::{JWT_SECRET_MIN_LENGTH, JwtTokenCodec};
pub use postgres_attachment_repository::PostgresAttachmentRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_bug_repository::PostgresBugRepository;
pub use postgres_comment_repository::PostgresCommentRepository;
pub use postgres_product_repository::PostgresProductRepository;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use postgres_user_repository::PostgresUserRepository;
pub use redis_actor_cache::RedisActorCache;
pub use redis_rate_limit_repository::RedisRateLimitRepository;
pub use redis_token_revocation_store::RedisTokenRevocationStore;
