//! CLI/environment configuration surface.
//!
//! Every field may come from a `COURIER_CONFIG` RON file, a CLI flag, or
//! the matching environment variable, in that precedence order -- mirroring
//! how this codebase already resolves its own config file before falling
//! back to process state.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use serde::Deserialize;

#[derive(Debug, Clone, Parser, Deserialize)]
#[command(name = "courier", about = "Delayed-delivery message scheduler")]
pub struct Config {
    /// Port the scheduler's own RPC listener binds to.
    #[arg(long, env = "PORT")]
    pub port: u16,

    #[arg(long, env = "REDIS_HOST")]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT")]
    pub redis_port: u16,

    #[arg(long, env = "redis_db", default_value_t = 0)]
    #[serde(default)]
    pub redis_db: i64,

    #[arg(long, env = "redis_idle_timeout", default_value_t = 5)]
    #[serde(default = "default_idle_timeout_secs")]
    pub redis_idle_timeout_secs: u64,

    #[arg(long, env = "redis_max_idle", default_value_t = 10)]
    #[serde(default = "default_max_idle")]
    pub redis_max_idle: usize,

    /// Path to the durable message store.
    #[arg(long, env = "db", default_value = "messages.db")]
    #[serde(default = "default_db_path")]
    pub db: PathBuf,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_idle_timeout_secs() -> u64 {
    5
}

fn default_max_idle() -> usize {
    10
}

fn default_db_path() -> PathBuf {
    "messages.db".into()
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    #[must_use]
    pub fn redis_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.redis_idle_timeout_secs)
    }

    #[must_use]
    pub fn queue_config(&self) -> courier_queue::config::QueueConfig {
        courier_queue::config::QueueConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            db: self.redis_db,
            max_idle: self.redis_max_idle,
            idle_timeout: self.redis_idle_timeout(),
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Resolve configuration: `COURIER_CONFIG` (a RON file) takes
    /// precedence over CLI flags and environment variables.
    ///
    /// # Errors
    /// Returns an error if `COURIER_CONFIG` is set but unreadable or not
    /// valid RON, or if neither a config file nor the required flags/env
    /// vars (`PORT`, `REDIS_HOST`, `REDIS_PORT`) are present.
    pub fn resolve() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var("COURIER_CONFIG") {
            let path = PathBuf::from(path);
            let content = std::fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("failed to read config from {}: {e}", path.display())
            })?;
            return Ok(ron::from_str(&content)?);
        }

        Ok(Self::parse())
    }
}
