//! Top-level error type composing every crate's own error enum.
//!
//! Per-crate errors (`courier_queue::QueueError`, `courier_store::StoreError`,
//! etc.) stay local to their crate. `CourierError` is the facade-level
//! composition used at the RPC boundary, where every underlying error must
//! collapse to one `{code, message}` wire shape.
use thiserror::Error;

/// Errors surfaced by the scheduler facade to its RPC callers.
#[derive(Debug, Error)]
pub enum CourierError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("message not found: {0}")]
    MessageNotFound(crate::MessageId),

    #[error("message content rejected by backend: {0}")]
    InvalidMessage(String),

    #[error("message status is terminal and cannot be updated")]
    TerminalStatus,

    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CourierError {
    /// Numeric code carried on the wire. Only a handful of cases warrant a
    /// more specific code than the default; everything else is `500`.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::ChannelNotFound(_) | Self::MessageNotFound(_) => 404,
            Self::InvalidMessage(_) | Self::TerminalStatus => 400,
            Self::BackendUnreachable(_) | Self::Internal(_) => 500,
        }
    }
}

/// Specialized `Result` alias for facade-level operations.
pub type Result<T> = std::result::Result<T, CourierError>;
