//! Inbound RPC server exposing [`Facade`] over `courier-rpc` framing.

use std::{sync::Arc, time::Duration};

use courier_backend::BackendClient;
use courier_common::Signal;
use courier_queue::Queue;
use courier_registry::Registry;
use courier_rpc::{FacadeRequest, FacadeResponse, WireError, read_frame, write_frame};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::broadcast;
use tracing::{error, trace, warn};

use crate::Facade;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Binds a TCP listener and dispatches each connection's single request to
/// the wrapped [`Facade`].
pub struct FacadeServer<Q, R, B> {
    facade: Arc<Facade<Q, R, B>>,
}

impl<Q, R, B> FacadeServer<Q, R, B>
where
    Q: Queue + 'static,
    R: Registry + 'static,
    B: BackendClient + 'static,
{
    #[must_use]
    pub fn new(facade: Arc<Facade<Q, R, B>>) -> Self {
        Self { facade }
    }

    /// Serve requests on `addr` until `shutdown` fires.
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound.
    pub async fn serve(
        &self,
        addr: impl ToSocketAddrs,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> courier_rpc::Result<()> {
        let listener = TcpListener::bind(addr).await?;

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let facade = Arc::clone(&self.facade);
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_connection(stream, facade).await {
                                    error!(%peer, error = %e, "error handling facade connection");
                                }
                            });
                        }
                        Err(e) => error!(error = %e, "error accepting facade connection"),
                    }
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) | Err(broadcast::error::RecvError::Closed) => {
                            trace!("facade server shutting down");
                            return Ok(());
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }
    }

    async fn handle_connection(mut stream: TcpStream, facade: Arc<Facade<Q, R, B>>) -> courier_rpc::Result<()> {
        let request: FacadeRequest = tokio::time::timeout(CONNECTION_TIMEOUT, read_frame(&mut stream))
            .await
            .map_err(|_| courier_rpc::RpcError::Timeout)??;

        trace!("received facade request");
        let response = Self::dispatch(&facade, request).await;

        tokio::time::timeout(CONNECTION_TIMEOUT, write_frame(&mut stream, &response))
            .await
            .map_err(|_| courier_rpc::RpcError::Timeout)??;

        Ok(())
    }

    async fn dispatch(facade: &Facade<Q, R, B>, request: FacadeRequest) -> FacadeResponse {
        match request {
            FacadeRequest::Put { channel, provider, content, delay } => {
                let result = facade.put(channel, provider, content, delay).await;
                FacadeResponse::Put(log_outcome("put", result))
            }
            FacadeRequest::Get { id } => {
                let result = facade.get(id);
                FacadeResponse::Get(log_outcome("get", result))
            }
            FacadeRequest::Update { id, content } => {
                let result = facade.update(id, content);
                FacadeResponse::Update(log_outcome("update", result))
            }
            FacadeRequest::Cancel { id } => {
                let result = facade.cancel(id).await;
                FacadeResponse::Cancel(log_outcome("cancel", result))
            }
            FacadeRequest::Register { channel } => {
                let result = facade.register(channel).await;
                FacadeResponse::Register(log_outcome("register", result))
            }
        }
    }
}

fn log_outcome<T>(op: &str, result: courier_common::Result<T>) -> Result<T, WireError> {
    result.map_err(|e| {
        warn!(op, error = %e, "facade operation failed");
        WireError::new(e.code(), e.to_string())
    })
}
