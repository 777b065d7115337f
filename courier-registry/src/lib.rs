//! Channel registry: `name -> Channel` lookup, backed by the same shared
//! Redis instance as `courier-queue`, key `channel:<name>`, value the
//! `Channel` record JSON-encoded (kept as JSON rather than `bincode` since
//! this table is small and worth being able to inspect with `redis-cli`).

pub mod error;

use async_trait::async_trait;
use courier_common::Channel;
pub use error::{RegistryError, Result};
use redis::AsyncCommands;
use tracing::trace;

const KEY_PREFIX: &str = "channel:";

fn key(name: &str) -> String {
    format!("{KEY_PREFIX}{name}")
}

/// Operations the facade needs from a channel registry. Implemented by
/// [`ChannelRegistry`] (Redis-backed) and [`MemoryRegistry`] (an in-process
/// fake for tests that don't want a Redis instance).
#[async_trait]
pub trait Registry: Send + Sync {
    async fn register(&self, channel: &Channel) -> Result<()>;
    async fn get(&self, name: &str) -> Result<Channel>;
    async fn get_all(&self) -> Result<Vec<Channel>>;
}

/// Handle to the shared channel registry.
#[derive(Clone)]
pub struct ChannelRegistry {
    pool: deadpool_redis::Pool,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }

    /// Register `channel`, overwriting any prior record under the same
    /// name. Re-registration does not merge provider lists with an
    /// existing record -- the new record is authoritative.
    pub async fn register(&self, channel: &Channel) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let encoded = serde_json::to_string(channel)?;
        let _: () = conn.set(key(&channel.name), encoded).await?;
        trace!(channel = %channel.name, "registered channel");
        Ok(())
    }

    /// Fetch a channel by name.
    pub async fn get(&self, name: &str) -> Result<Channel> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(key(name)).await?;
        let raw = raw.ok_or_else(|| RegistryError::NotFound(name.to_owned()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Fetch every registered channel.
    ///
    /// The source this was ported from checked `if err == nil { return nil,
    /// err }` after each Redis call here -- inverted, so it only ever
    /// short-circuited on *success*. The correct check, used below, is
    /// `if let Err(e) = ... { return Err(e) }`.
    pub async fn get_all(&self) -> Result<Vec<Channel>> {
        let mut conn = self.pool.get().await?;

        let keys: Vec<String> = conn.keys(format!("{KEY_PREFIX}*")).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = conn.mget(&keys).await?;

        values
            .into_iter()
            .flatten()
            .map(|raw| serde_json::from_str(&raw).map_err(RegistryError::from))
            .collect()
    }
}

#[async_trait]
impl Registry for ChannelRegistry {
    async fn register(&self, channel: &Channel) -> Result<()> {
        Self::register(self, channel).await
    }

    async fn get(&self, name: &str) -> Result<Channel> {
        Self::get(self, name).await
    }

    async fn get_all(&self) -> Result<Vec<Channel>> {
        Self::get_all(self).await
    }
}

/// In-process fake registry for tests.
#[derive(Default)]
pub struct MemoryRegistry {
    channels: std::sync::Mutex<std::collections::HashMap<String, Channel>>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(&self, channel: &Channel) -> Result<()> {
        self.channels
            .lock()
            .unwrap()
            .insert(channel.name.clone(), channel.clone());
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Channel> {
        self.channels
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))
    }

    async fn get_all(&self) -> Result<Vec<Channel>> {
        Ok(self.channels.lock().unwrap().values().cloned().collect())
    }
}
