//! Connection configuration for the priority queue's Redis pool.

use std::time::Duration;

use deadpool_redis::{Config as RedisConfig, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, Runtime};

use crate::error::Result;

/// Pool parameters, mirroring the `redis_max_idle`/`redis_idle_timeout`/
/// `redis_db` flags this system has always exposed.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub max_idle: usize,
    pub idle_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6379,
            db: 0,
            max_idle: 8,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl QueueConfig {
    /// Build a bounded `deadpool_redis` pool from this configuration.
    pub fn build_pool(&self) -> Result<deadpool_redis::Pool> {
        let connection_info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                username: None,
                password: None,
                protocol: redis::ProtocolVersion::RESP2,
            },
        };

        let mut pool_config = deadpool_redis::PoolConfig::new(self.max_idle.max(1));
        pool_config.timeouts.wait = Some(self.idle_timeout);

        let config = RedisConfig {
            url: None,
            connection: Some(connection_info),
            pool: Some(pool_config),
        };

        Ok(config.create_pool(Some(Runtime::Tokio1))?)
    }
}
