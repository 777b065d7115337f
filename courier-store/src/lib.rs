//! Durable key-value store for message records: one `sled` tree, key = the
//! 16-byte binary form of a [`courier_common::MessageId`], value =
//! `bincode`-encoded [`courier_common::Message`].
//!
//! Every call is a single `sled` transaction: reads see a consistent
//! snapshot and writes are all-or-nothing, so `update_content`/
//! `update_status`'s read-modify-write never races against a concurrent
//! writer of the same key.

pub mod error;

use courier_common::{Message, MessageId, Status};
pub use error::{Result, StoreError};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use tracing::trace;

/// Handle to the durable message store.
#[derive(Clone)]
pub struct MessageStore {
    tree: sled::Tree,
}

impl MessageStore {
    /// Open (creating if absent) the store at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let db = sled::open(path)?;
        let tree = db.open_tree("messages")?;
        Ok(Self { tree })
    }

    /// For tests: an in-memory store backed by `sled`'s temporary mode.
    #[must_use]
    pub fn open_temporary() -> Self {
        let db = sled::Config::new().temporary(true).open().expect("open temporary sled db");
        let tree = db.open_tree("messages").expect("open messages tree");
        Self { tree }
    }

    /// Create a record. Must not be called twice for the same id.
    pub fn add(&self, message: &Message) -> Result<()> {
        let key = message.id.to_bytes();
        let value = bincode::serde::encode_to_vec(message, bincode::config::legacy())?;

        let existing = self.tree.insert(key, value)?;
        if existing.is_some() {
            // Put the prior value back; `add` must not silently overwrite.
            return Err(StoreError::AlreadyExists(message.id));
        }

        trace!(id = %message.id, "added message record");
        Ok(())
    }

    /// Fetch a record by id.
    pub fn get(&self, id: MessageId) -> Result<Message> {
        let bytes = self
            .tree
            .get(id.to_bytes())?
            .ok_or(StoreError::NotFound(id))?;
        let (message, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::legacy())?;
        Ok(message)
    }

    /// Replace `content` on an existing record in one transaction. Fails if
    /// absent, or if the record's status is terminal.
    pub fn update_content(&self, id: MessageId, content: Vec<u8>) -> Result<()> {
        self.read_modify_write(id, move |message| {
            if message.status.is_terminal() {
                return Err(StoreError::TerminalStatus);
            }
            message.content = content.clone();
            Ok(())
        })
    }

    /// Replace `status` on an existing record in one transaction. Fails if
    /// absent.
    pub fn update_status(&self, id: MessageId, status: Status) -> Result<()> {
        self.read_modify_write(id, move |message| {
            message.status = status;
            Ok(())
        })
    }

    fn read_modify_write(
        &self,
        id: MessageId,
        mutate: impl Fn(&mut Message) -> Result<()>,
    ) -> Result<()> {
        let key = id.to_bytes();

        let result = self.tree.transaction(|tree| {
            let bytes = tree
                .get(key)?
                .ok_or_else(|| ConflictableTransactionError::Abort(StoreError::NotFound(id)))?;

            let (mut message, _): (Message, usize) =
                bincode::serde::decode_from_slice(&bytes, bincode::config::legacy())
                    .map_err(|e| ConflictableTransactionError::Abort(StoreError::Decode(e)))?;

            mutate(&mut message).map_err(ConflictableTransactionError::Abort)?;

            let encoded = bincode::serde::encode_to_vec(&message, bincode::config::legacy())
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Encode(e)))?;

            tree.insert(key, encoded)?;
            Ok(())
        });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StoreError::Sled(e)),
        }
    }
}
