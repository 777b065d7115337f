//! Framing and protocol errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("frame encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("frame of {0} bytes exceeds the {1}-byte limit")]
    FrameTooLarge(u32, u32),

    #[error("connection closed before a full frame was received")]
    ConnectionClosed,

    #[error("request timed out")]
    Timeout,

    #[error("backend returned an error: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, RpcError>;
