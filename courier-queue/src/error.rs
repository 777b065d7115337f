//! Errors from the priority queue backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("redis pool configuration error: {0}")]
    PoolConfig(#[from] deadpool_redis::CreatePoolError),

    #[error("malformed message id in priority queue: {0}")]
    MalformedId(#[from] ulid::DecodeError),
}

pub type Result<T> = std::result::Result<T, QueueError>;
