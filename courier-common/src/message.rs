//! The message record persisted in the message store.

use serde::{Deserialize, Serialize};

use crate::{MessageId, Status};

/// A scheduled message as held in `courier-store`.
///
/// `content` is opaque to the scheduler; only the channel backend
/// interprets it. `content` may only be mutated while `status` is
/// [`Status::Pending`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel: String,
    pub provider: String,
    pub content: Vec<u8>,
    pub status: Status,
}

impl Message {
    #[must_use]
    pub fn pending(id: MessageId, channel: String, provider: String, content: Vec<u8>) -> Self {
        Self {
            id,
            channel,
            provider,
            content,
            status: Status::Pending,
        }
    }
}
