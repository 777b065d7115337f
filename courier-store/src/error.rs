//! Errors from the durable message store.

use courier_common::MessageId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("deserialization error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("message not found: {0}")]
    NotFound(MessageId),

    #[error("message already exists: {0}")]
    AlreadyExists(MessageId),

    #[error("message status is terminal and cannot be updated")]
    TerminalStatus,
}

pub type Result<T> = std::result::Result<T, StoreError>;
