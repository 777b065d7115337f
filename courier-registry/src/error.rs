//! Errors from the channel registry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("malformed channel record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("channel not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
