//! Top-level orchestration: wires every component together and runs them
//! until a shutdown signal arrives.

use std::sync::{Arc, LazyLock};

use courier_backend::TcpBackendClient;
use courier_common::{Signal, internal, logging};
use courier_dispatch::Dispatcher;
use courier_facade::{Facade, FacadeServer};
use courier_queue::PriorityQueue;
use courier_registry::ChannelRegistry;
use courier_store::MessageStore;
use tokio::sync::broadcast;

use crate::config::Config;

/// Broadcast channel every long-running component subscribes to so a
/// single shutdown signal reaches all of them.
pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!("Terminate signal received, shutting down");
        }
    };

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();
    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    loop {
        tokio::select! {
            sig = receiver.recv() => {
                match sig {
                    Ok(s) => tracing::debug!("received {s:?}"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!("received: {e:?}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Boots the priority queue, message store, channel registry, backend
/// client, dispatcher loop and facade RPC server, and runs them until
/// shutdown.
pub struct Courier {
    config: Config,
}

impl Courier {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// # Errors
    /// Returns an error if the Redis pool, message store or RPC listener
    /// fail to initialise, or if any long-running component exits with an
    /// error.
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();
        internal!("courier starting on port {}", self.config.port);

        let pool = self.config.queue_config().build_pool()?;
        let queue = Arc::new(PriorityQueue::new(pool.clone()));
        let store = MessageStore::open(&self.config.db)?;
        let registry = Arc::new(ChannelRegistry::new(pool));
        let backend = Arc::new(TcpBackendClient);

        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            store.clone(),
            Arc::clone(&registry),
            Arc::clone(&backend),
        );
        let dispatch_handle = dispatcher.handle();

        let facade = Arc::new(Facade::new(queue, store, registry, backend, dispatch_handle));
        let server = FacadeServer::new(facade);
        let bind_addr = self.config.bind_addr();

        internal!("listening on {bind_addr}");

        let ret = tokio::select! {
            r = dispatcher.run(SHUTDOWN_BROADCAST.subscribe()) => r.map_err(anyhow::Error::from),
            r = server.serve(bind_addr, SHUTDOWN_BROADCAST.subscribe()) => r.map_err(anyhow::Error::from),
            r = shutdown() => r,
        };

        internal!("shutting down...");

        ret
    }
}
