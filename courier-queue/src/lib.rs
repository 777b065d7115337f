//! Time-ordered priority queue of pending message ids, backed by a Redis
//! sorted set (`pq:ids`, score = scheduled timestamp, member = id string) so
//! multiple scheduler processes can coordinate over one queue.
//!
//! Every operation is a single atomic server-side Lua script so two
//! concurrent dispatchers can never pop the same id.

pub mod config;
pub mod error;

use async_trait::async_trait;
use courier_common::MessageId;
pub use error::{QueueError, Result};
use redis::Script;
use tracing::trace;

/// Operations the dispatcher loop and the facade need from a priority
/// queue. Implemented by [`PriorityQueue`] (Redis-backed) and by
/// [`MemoryQueue`] (an in-process fake for tests that don't want a Redis
/// instance).
#[async_trait]
pub trait Queue: Send + Sync {
    async fn push(&self, id: MessageId) -> Result<()>;
    async fn peek(&self) -> Result<Option<MessageId>>;
    async fn pop(&self) -> Result<Option<MessageId>>;
    async fn delete_by_id(&self, id: MessageId) -> Result<bool>;
}

const POP_SCRIPT: &str = r"
    local result_set = redis.call('ZRANGE', 'pq:ids', 0, 0)
    if not result_set or #result_set == 0 then
        return false
    end
    redis.call('ZREMRANGEBYRANK', 'pq:ids', 0, 0)
    return result_set[1]
";

const PEEK_SCRIPT: &str = r"
    local result_set = redis.call('ZRANGE', 'pq:ids', 0, 0)
    if not result_set or #result_set == 0 then
        return false
    end
    return result_set[1]
";

const PUSH_SCRIPT: &str = r"
    local timestamp = ARGV[1]
    local id = ARGV[2]
    redis.call('ZADD', 'pq:ids', timestamp, id)
    return true
";

// Fixed from the source this was ported from, which issued `DEL 'pq:ids' id`
// here -- `DEL` does not remove a single member from a sorted set, so a
// cancelled id never actually left the queue. `ZREM` is the correct op.
const DELETE_SCRIPT: &str = r"
    local id = ARGV[1]
    local removed = redis.call('ZREM', 'pq:ids', id)
    return removed
";

/// Handle to the shared priority queue.
#[derive(Clone)]
pub struct PriorityQueue {
    pool: deadpool_redis::Pool,
}

impl PriorityQueue {
    #[must_use]
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }

    /// Insert `id`, scored by its encoded timestamp. Idempotent: pushing an
    /// id already present just re-scores it to the same value.
    pub async fn push(&self, id: MessageId) -> Result<()> {
        let mut conn = self.pool.get().await?;
        Script::new(PUSH_SCRIPT)
            .arg(id.timestamp_ms())
            .arg(id.to_string())
            .invoke_async::<bool>(&mut conn)
            .await?;
        trace!(%id, "pushed id onto priority queue");
        Ok(())
    }

    /// The smallest-scored id, without removing it.
    pub async fn peek(&self) -> Result<Option<MessageId>> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = Script::new(PEEK_SCRIPT).invoke_async(&mut conn).await?;
        raw.map(|s| s.parse().map_err(QueueError::MalformedId))
            .transpose()
    }

    /// Atomically read-and-remove the smallest-scored id.
    pub async fn pop(&self) -> Result<Option<MessageId>> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = Script::new(POP_SCRIPT).invoke_async(&mut conn).await?;
        let id = raw.map(|s| s.parse().map_err(QueueError::MalformedId)).transpose()?;
        if let Some(id) = id {
            trace!(%id, "popped id from priority queue");
        }
        Ok(id)
    }

    /// Remove `id` if present; returns whether it was present.
    pub async fn delete_by_id(&self, id: MessageId) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let removed: i64 = Script::new(DELETE_SCRIPT)
            .arg(id.to_string())
            .invoke_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl Queue for PriorityQueue {
    async fn push(&self, id: MessageId) -> Result<()> {
        Self::push(self, id).await
    }

    async fn peek(&self) -> Result<Option<MessageId>> {
        Self::peek(self).await
    }

    async fn pop(&self) -> Result<Option<MessageId>> {
        Self::pop(self).await
    }

    async fn delete_by_id(&self, id: MessageId) -> Result<bool> {
        Self::delete_by_id(self, id).await
    }
}

/// In-process fake queue for tests, ordered the same way the real sorted
/// set is: by id (whose natural `Ord` already follows its encoded
/// timestamp).
#[derive(Default)]
pub struct MemoryQueue {
    ids: std::sync::Mutex<std::collections::BTreeSet<MessageId>>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn push(&self, id: MessageId) -> Result<()> {
        self.ids.lock().unwrap().insert(id);
        Ok(())
    }

    async fn peek(&self) -> Result<Option<MessageId>> {
        Ok(self.ids.lock().unwrap().iter().next().copied())
    }

    async fn pop(&self) -> Result<Option<MessageId>> {
        let mut ids = self.ids.lock().unwrap();
        let first = ids.iter().next().copied();
        if let Some(id) = first {
            ids.remove(&id);
        }
        Ok(first)
    }

    async fn delete_by_id(&self, id: MessageId) -> Result<bool> {
        Ok(self.ids.lock().unwrap().remove(&id))
    }
}

#[cfg(test)]
mod tests {
    // Exercising the Lua scripts against a real sorted set requires a live
    // Redis instance; that integration coverage lives outside unit tests.
    // `MemoryQueue`'s ordering and single-pop behaviour is covered here
    // since it's meant to behave identically to the scripts above.
    use std::time::Duration;

    use courier_common::MessageId;

    use super::*;

    #[test]
    fn delete_script_uses_zrem_not_del() {
        assert!(DELETE_SCRIPT.contains("ZREM"));
        assert!(!DELETE_SCRIPT.contains("redis.call('DEL'"));
    }

    #[tokio::test]
    async fn memory_queue_pops_in_timestamp_order() {
        let queue = MemoryQueue::new();
        let later = MessageId::generate_at(Duration::from_secs(10));
        let earlier = MessageId::generate_at(Duration::from_secs(1));

        queue.push(later).await.unwrap();
        queue.push(earlier).await.unwrap();

        assert_eq!(queue.peek().await.unwrap(), Some(earlier));
        assert_eq!(queue.pop().await.unwrap(), Some(earlier));
        assert_eq!(queue.pop().await.unwrap(), Some(later));
        assert_eq!(queue.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_queue_delete_by_id_removes_pending_entry() {
        let queue = MemoryQueue::new();
        let id = MessageId::generate_at(Duration::from_secs(1));
        queue.push(id).await.unwrap();

        assert!(queue.delete_by_id(id).await.unwrap());
        assert!(!queue.delete_by_id(id).await.unwrap());
        assert_eq!(queue.peek().await.unwrap(), None);
    }
}
