//! Wire types for the two RPC surfaces this crate frames:
//! the inbound scheduler facade (`FacadeRequest`/`FacadeResponse`) and the
//! outbound channel backend (`BackendRequest`/`BackendResponse`).

use std::time::Duration;

use courier_common::{Channel, Message, MessageId};
use serde::{Deserialize, Serialize};

/// An error as carried on the wire: a numeric code plus a human message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub code: u32,
    pub message: String,
}

impl WireError {
    #[must_use]
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

// ---------------------------------------------------------------------
// Scheduler facade surface: Put, Get, Update, Cancel, Register.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FacadeRequest {
    Put {
        channel: String,
        provider: String,
        content: Vec<u8>,
        delay: Duration,
    },
    Get {
        id: MessageId,
    },
    Update {
        id: MessageId,
        content: Vec<u8>,
    },
    Cancel {
        id: MessageId,
    },
    Register {
        channel: Channel,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FacadeResponse {
    Put(Result<MessageId, WireError>),
    Get(Result<Message, WireError>),
    Update(Result<(), WireError>),
    Cancel(Result<(), WireError>),
    Register(Result<(), WireError>),
}

// ---------------------------------------------------------------------
// Channel backend surface: Approve, Deliver.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackendRequest {
    Approve { content: Vec<u8> },
    Deliver { content: Vec<u8> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveReply {
    pub valid: bool,
    pub error: Option<WireError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverReply {
    pub error: Option<WireError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackendResponse {
    Approve(ApproveReply),
    Deliver(DeliverReply),
}
