//! Shared types, errors and logging plumbing used by every `courier` crate.

pub mod channel;
pub mod error;
pub mod logging;
pub mod message;
pub mod message_id;
pub mod status;

pub use channel::{Channel, Provider};
pub use error::{CourierError, Result};
pub use message::Message;
pub use message_id::MessageId;
pub use status::Status;

/// Process-wide lifecycle signal, broadcast to every long-running task so
/// they can shut down cooperatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Shutdown has been requested; finish in-flight work and stop.
    Shutdown,
    /// A component has finished tearing down.
    Finalised,
}

/// Re-exported so macros defined here can refer to `$crate::tracing` from a
/// downstream crate without that crate depending on `tracing` directly.
pub use tracing;
