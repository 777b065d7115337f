//! Client for the `Approve`/`Deliver` RPCs a channel backend exposes.
//!
//! One connection per call -- connection pooling is not required here, the
//! way it is for the shared Redis-backed components, since each backend
//! calls is already isolated per delivery worker task.

pub mod error;

use std::time::Duration;

use async_trait::async_trait;
pub use error::{BackendError, Result};
use courier_common::Channel;
use courier_rpc::{BackendRequest, BackendResponse, read_frame, write_frame};
use tokio::net::TcpStream;
use tracing::trace;

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of an `Approve` call.
#[derive(Debug, Clone)]
pub struct Approval {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Calls a channel's backend over `courier-rpc` framing.
///
/// A trait so the facade and its tests can substitute a fake backend
/// without spinning up a real TCP listener.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn approve(&self, channel: &Channel, content: &[u8]) -> Result<Approval>;
    async fn deliver(&self, channel: &Channel, content: &[u8]) -> Result<()>;
}

/// The real, TCP-backed implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpBackendClient;

impl TcpBackendClient {
    async fn call(&self, channel: &Channel, request: &BackendRequest) -> Result<BackendResponse> {
        let address = channel.address();
        let fut = async {
            let mut stream = TcpStream::connect(&address).await?;
            write_frame(&mut stream, request).await?;
            let response: BackendResponse = read_frame(&mut stream).await?;
            Ok::<_, courier_rpc::RpcError>(response)
        };

        let response = tokio::time::timeout(CALL_TIMEOUT, fut)
            .await
            .map_err(|_| BackendError::Crashed(courier_rpc::RpcError::Timeout))??;

        trace!(%address, "received backend response");
        Ok(response)
    }
}

#[async_trait]
impl BackendClient for TcpBackendClient {
    async fn approve(&self, channel: &Channel, content: &[u8]) -> Result<Approval> {
        let request = BackendRequest::Approve {
            content: content.to_vec(),
        };
        match self.call(channel, &request).await? {
            BackendResponse::Approve(reply) => Ok(Approval {
                valid: reply.valid,
                reason: reply.error.map(|e| e.message),
            }),
            BackendResponse::Deliver(_) => Err(BackendError::Crashed(courier_rpc::RpcError::Remote(
                "backend replied to Approve with a Deliver response".into(),
            ))),
        }
    }

    async fn deliver(&self, channel: &Channel, content: &[u8]) -> Result<()> {
        let request = BackendRequest::Deliver {
            content: content.to_vec(),
        };
        match self.call(channel, &request).await? {
            BackendResponse::Deliver(reply) => match reply.error {
                None => Ok(()),
                Some(e) => Err(BackendError::Failed(e.message)),
            },
            BackendResponse::Approve(_) => Err(BackendError::Crashed(courier_rpc::RpcError::Remote(
                "backend replied to Deliver with an Approve response".into(),
            ))),
        }
    }
}
