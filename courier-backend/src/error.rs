//! Errors from calling a channel's backend.

use thiserror::Error;

/// Every failure a backend call can produce, already classified into the
/// two buckets the facade cares about: `Crashed` (the transport itself
/// failed -- unreachable, timed out, malformed reply) vs `Failed` (the
/// backend was reached and answered negatively).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Crashed(#[from] courier_rpc::RpcError),

    #[error("backend rejected the request: {0}")]
    Failed(String),
}

impl BackendError {
    #[must_use]
    pub const fn is_crashed(&self) -> bool {
        matches!(self, Self::Crashed(_))
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
