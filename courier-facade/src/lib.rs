//! The scheduler facade: `put`/`get`/`update`/`cancel`/`register`, wiring
//! the priority queue, message store, channel registry, backend client and
//! dispatcher together per the message lifecycle state machine; and the
//! inbound RPC server exposing that contract over `courier-rpc` framing.

pub mod server;

use std::time::Duration;

use courier_backend::BackendClient;
use courier_common::{Channel, CourierError, Message, MessageId, Result, Status};
use courier_dispatch::DispatchHandle;
use courier_queue::Queue;
use courier_registry::Registry;
use courier_store::{MessageStore, StoreError};
use tracing::trace;

pub use server::FacadeServer;

/// The scheduler's public operations, generic over the queue/registry/
/// backend implementations so tests can substitute in-process fakes.
pub struct Facade<Q, R, B> {
    queue: std::sync::Arc<Q>,
    store: MessageStore,
    registry: std::sync::Arc<R>,
    backend: std::sync::Arc<B>,
    dispatch: DispatchHandle,
}

impl<Q, R, B> Facade<Q, R, B>
where
    Q: Queue,
    R: Registry,
    B: BackendClient,
{
    pub fn new(
        queue: std::sync::Arc<Q>,
        store: MessageStore,
        registry: std::sync::Arc<R>,
        backend: std::sync::Arc<B>,
        dispatch: DispatchHandle,
    ) -> Self {
        Self {
            queue,
            store,
            registry,
            backend,
            dispatch,
        }
    }

    /// Schedule `content` for delivery to `channel`/`provider` after
    /// `delay`.
    ///
    /// If the backend's `Approve` call fails at the transport level, no
    /// record is added to the message store (there is nothing to roll
    /// back) and the transport error is returned directly. If `Approve`
    /// succeeds but reports the content invalid, a record *is* added with
    /// status `failed-approve`, purely for auditability, and an
    /// `InvalidMessage` error is returned.
    pub async fn put(
        &self,
        channel: String,
        provider: String,
        content: Vec<u8>,
        delay: Duration,
    ) -> Result<MessageId> {
        let channel_record = self
            .registry
            .get(&channel)
            .await
            .map_err(|_| CourierError::ChannelNotFound(channel.clone()))?;

        let id = MessageId::generate_at(delay);

        let approval = self
            .backend
            .approve(&channel_record, &content)
            .await
            .map_err(|e| CourierError::BackendUnreachable(e.to_string()))?;

        if !approval.valid {
            let mut rejected = Message::pending(id, channel, provider, content);
            rejected.status = Status::FailedApprove;
            self.store
                .add(&rejected)
                .map_err(|e| CourierError::Internal(e.into()))?;
            return Err(CourierError::InvalidMessage(
                approval.reason.unwrap_or_else(|| "rejected by backend".into()),
            ));
        }

        let message = Message::pending(id, channel, provider, content);
        self.store
            .add(&message)
            .map_err(|e| CourierError::Internal(e.into()))?;

        self.queue
            .push(id)
            .await
            .map_err(|e| CourierError::Internal(e.into()))?;
        self.dispatch.wake();

        trace!(%id, "message scheduled");
        Ok(id)
    }

    /// Fetch a message record by id.
    pub fn get(&self, id: MessageId) -> Result<Message> {
        self.store.get(id).map_err(|e| store_error_to_facade(id, e))
    }

    /// Replace a pending message's content. Rejected if the message's
    /// status is already terminal.
    pub fn update(&self, id: MessageId, content: Vec<u8>) -> Result<()> {
        self.store
            .update_content(id, content)
            .map_err(|e| store_error_to_facade(id, e))
    }

    /// Cancel a pending message. A no-op (not an error) if the id is no
    /// longer in the queue -- it may already have been dispatched.
    pub async fn cancel(&self, id: MessageId) -> Result<()> {
        let was_pending = self
            .queue
            .delete_by_id(id)
            .await
            .map_err(|e| CourierError::Internal(e.into()))?;

        if was_pending {
            self.store
                .update_status(id, Status::Cancelled)
                .map_err(|e| CourierError::Internal(e.into()))?;
        }

        Ok(())
    }

    /// Register a channel, overwriting any existing record under the same
    /// name.
    pub async fn register(&self, channel: Channel) -> Result<()> {
        self.registry
            .register(&channel)
            .await
            .map_err(|e| CourierError::Internal(e.into()))
    }
}

fn store_error_to_facade(id: MessageId, e: StoreError) -> CourierError {
    match e {
        StoreError::NotFound(_) => CourierError::MessageNotFound(id),
        StoreError::TerminalStatus => CourierError::TerminalStatus,
        other => CourierError::Internal(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use async_trait::async_trait;
    use courier_backend::{Approval, BackendClient, BackendError};
    use courier_common::Provider;
    use courier_dispatch::Dispatcher;
    use courier_queue::MemoryQueue;
    use courier_registry::MemoryRegistry;

    use super::*;

    struct FakeBackend {
        approve_transport_fails: bool,
        approve_valid: bool,
    }

    #[async_trait]
    impl BackendClient for FakeBackend {
        async fn approve(&self, _channel: &Channel, _content: &[u8]) -> courier_backend::Result<Approval> {
            if self.approve_transport_fails {
                return Err(BackendError::Crashed(courier_rpc::RpcError::Timeout));
            }
            Ok(Approval {
                valid: self.approve_valid,
                reason: if self.approve_valid { None } else { Some("bad content".into()) },
            })
        }

        async fn deliver(&self, _channel: &Channel, _content: &[u8]) -> courier_backend::Result<()> {
            Ok(())
        }
    }

    fn channel() -> Channel {
        Channel {
            name: "sms".into(),
            host: "127.0.0.1".into(),
            port: 9000,
            providers: vec![Provider { name: "twilio".into(), params: HashMap::new() }],
        }
    }

    async fn facade(backend: FakeBackend) -> Facade<MemoryQueue, MemoryRegistry, FakeBackend> {
        let queue = Arc::new(MemoryQueue::new());
        let store = MessageStore::open_temporary();
        let registry = Arc::new(MemoryRegistry::new());
        registry.register(&channel()).await.unwrap();
        let backend = Arc::new(backend);

        let dispatcher = Dispatcher::new(Arc::clone(&queue), store.clone(), Arc::clone(&registry), Arc::clone(&backend));
        let handle = dispatcher.handle();
        // The dispatcher loop is intentionally never run in these facade
        // tests: `put` pushes onto the queue and wakes it itself, so these
        // tests only need to check what `put`/`cancel` do to the store and
        // queue, never actual delivery.
        std::mem::forget(dispatcher);

        Facade::new(queue, store, registry, backend, handle)
    }

    #[tokio::test]
    async fn put_rejects_unknown_channel() {
        let facade = facade(FakeBackend { approve_transport_fails: false, approve_valid: true }).await;
        let err = facade
            .put("unknown".into(), "twilio".into(), b"hi".to_vec(), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::ChannelNotFound(_)));
    }

    #[tokio::test]
    async fn put_on_approve_transport_failure_adds_no_record() {
        let facade = facade(FakeBackend { approve_transport_fails: true, approve_valid: true }).await;
        let err = facade
            .put("sms".into(), "twilio".into(), b"hi".to_vec(), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::BackendUnreachable(_)));
    }

    #[tokio::test]
    async fn put_on_invalid_approval_returns_invalid_message() {
        let facade = facade(FakeBackend { approve_transport_fails: false, approve_valid: false }).await;
        let err = facade
            .put("sms".into(), "twilio".into(), b"hi".to_vec(), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::InvalidMessage(reason) if reason == "bad content"));
    }

    #[tokio::test]
    async fn update_rejects_terminal_message() {
        let facade = facade(FakeBackend { approve_transport_fails: false, approve_valid: true }).await;
        let id = facade
            .put("sms".into(), "twilio".into(), b"hi".to_vec(), Duration::ZERO)
            .await
            .unwrap();
        facade.store.update_status(id, Status::Sent).unwrap();

        let err = facade.update(id, b"new".to_vec()).unwrap_err();
        assert!(matches!(err, CourierError::TerminalStatus));
    }

    #[tokio::test]
    async fn cancel_on_pending_id_marks_cancelled() {
        let facade = facade(FakeBackend { approve_transport_fails: false, approve_valid: true }).await;
        let id = facade
            .put("sms".into(), "twilio".into(), b"hi".to_vec(), Duration::ZERO)
            .await
            .unwrap();
        // `put` already pushed `id` onto the queue itself.

        facade.cancel(id).await.unwrap();
        assert_eq!(facade.get(id).unwrap().status, Status::Cancelled);
    }

    #[tokio::test]
    async fn cancel_on_already_dispatched_id_is_a_no_op() {
        let facade = facade(FakeBackend { approve_transport_fails: false, approve_valid: true }).await;
        let id = facade
            .put("sms".into(), "twilio".into(), b"hi".to_vec(), Duration::ZERO)
            .await
            .unwrap();
        // Simulate the dispatcher having already popped it for delivery.
        facade.queue.pop().await.unwrap();

        facade.cancel(id).await.unwrap();
        assert_eq!(facade.get(id).unwrap().status, Status::Pending);
    }

    #[tokio::test]
    async fn register_overwrites_existing_channel() {
        let facade = facade(FakeBackend { approve_transport_fails: false, approve_valid: true }).await;
        let mut updated = channel();
        updated.port = 9999;
        facade.register(updated).await.unwrap();

        let stored = facade.registry.get("sms").await.unwrap();
        assert_eq!(stored.port, 9999);
    }

}
