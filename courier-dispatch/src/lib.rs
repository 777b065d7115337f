//! The dispatcher loop: a single task per process that sleeps to the
//! earliest scheduled instant in the priority queue, pops ids as they come
//! due, and spawns one delivery worker per popped id.
//!
//! The loop is always blocked on exactly one of: a rearmed timer (only
//! while the queue is non-empty), a wake notification, or the shutdown
//! signal. Each iteration re-peeks the queue rather than tracking a
//! separate `next_deadline` field, so a push that moves the earliest
//! deadline earlier is picked up on the very next loop turn.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use courier_backend::BackendClient;
use courier_common::{MessageId, Signal, Status};
use courier_queue::Queue;
use courier_registry::Registry;
use courier_store::MessageStore;
use tokio::sync::{Notify, broadcast};
use tracing::{trace, warn};

/// Handle the facade uses to nudge the dispatcher into re-peeking the queue
/// right away, rather than waiting out its current sleep.
///
/// `Put` pushes a newly-scheduled id onto the shared queue itself and then
/// calls [`DispatchHandle::wake`] -- it does not hand the id to the
/// dispatcher over a channel for the dispatcher to push later. A channel
/// send completing says nothing about whether the id has actually been
/// enqueued yet, which previously let `Cancel` race ahead of the dispatcher
/// and observe an empty queue. Pushing directly makes "`Put` returned" and
/// "the id is in the queue" the same instant.
#[derive(Clone)]
pub struct DispatchHandle {
    wake: Arc<Notify>,
}

impl DispatchHandle {
    /// Wake the dispatcher so it re-peeks the queue now. Safe to call
    /// whether or not the dispatcher is currently sleeping -- the
    /// notification is never lost.
    pub fn wake(&self) {
        self.wake.notify_one();
    }
}

/// Owns the priority queue, message store, channel registry and backend
/// client, and runs the single dispatcher task that ties them together.
pub struct Dispatcher<Q, R, B> {
    queue: Arc<Q>,
    store: MessageStore,
    registry: Arc<R>,
    backend: Arc<B>,
    wake: Arc<Notify>,
}

impl<Q, R, B> Dispatcher<Q, R, B>
where
    Q: Queue + 'static,
    R: Registry + 'static,
    B: BackendClient + 'static,
{
    pub fn new(queue: Arc<Q>, store: MessageStore, registry: Arc<R>, backend: Arc<B>) -> Self {
        Self {
            queue,
            store,
            registry,
            backend,
            wake: Arc::new(Notify::new()),
        }
    }

    /// A cloneable handle for waking the dispatcher after a direct queue push.
    #[must_use]
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            wake: Arc::clone(&self.wake),
        }
    }

    /// Run the dispatcher until `shutdown` fires.
    ///
    /// # Errors
    /// Returns an error if the priority queue itself becomes unusable; the
    /// dispatcher cannot proceed without trusting queue state, so it does
    /// not attempt to soldier on through such an error.
    pub async fn run(self, mut shutdown: broadcast::Receiver<Signal>) -> courier_queue::Result<()> {
        loop {
            let next = self.queue.peek().await?;
            let sleep_until = next.map(|id| sleep_until_due(id));

            tokio::select! {
                () = conditional_sleep(sleep_until), if next.is_some() => {
                    if let Some(id) = self.queue.pop().await? {
                        trace!(%id, "dispatching due message");
                        spawn_delivery(id, self.store.clone(), Arc::clone(&self.registry), Arc::clone(&self.backend));
                    }
                }
                () = self.wake.notified() => {
                    // Nothing to do here; the loop re-peeks on its next turn.
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) | Err(broadcast::error::RecvError::Closed) => {
                            trace!("dispatcher shutting down");
                            return Ok(());
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }
    }
}

fn sleep_until_due(id: MessageId) -> Duration {
    let now_ms = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64);
    Duration::from_millis(id.timestamp_ms().saturating_sub(now_ms))
}

async fn conditional_sleep(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

fn spawn_delivery<R, B>(id: MessageId, store: MessageStore, registry: Arc<R>, backend: Arc<B>)
where
    R: Registry + 'static,
    B: BackendClient + 'static,
{
    tokio::spawn(async move {
        let message = match store.get(id) {
            Ok(m) => m,
            Err(e) => {
                warn!(%id, error = %e, "dispatched id has no message record");
                return;
            }
        };

        let channel = match registry.get(&message.channel).await {
            Ok(c) => c,
            Err(e) => {
                // No status change: the message is stranded with status
                // `pending` and no longer in the queue. A deliberate,
                // documented consistency gap rather than a guess at
                // recovery behaviour nothing asked for.
                warn!(%id, channel = %message.channel, error = %e, "channel not registered, message stranded");
                return;
            }
        };

        let outcome = backend.deliver(&channel, &message.content).await;
        let status = match outcome {
            Ok(()) => Status::Sent,
            Err(e) if e.is_crashed() => {
                warn!(%id, error = %e, "delivery transport failed");
                Status::CrashedDeliver
            }
            Err(e) => {
                warn!(%id, error = %e, "delivery rejected by backend");
                Status::FailedDeliver
            }
        };

        if let Err(e) = store.update_status(id, status) {
            warn!(%id, error = %e, "failed to record delivery outcome");
        }
    });
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use async_trait::async_trait;
    use courier_backend::{Approval, BackendClient, BackendError};
    use courier_common::{Channel, Message, MessageId, Provider};
    use courier_queue::MemoryQueue;
    use courier_registry::MemoryRegistry;
    use courier_store::MessageStore;
    use tokio::sync::broadcast;

    use super::*;

    struct AlwaysDeliver;

    #[async_trait]
    impl BackendClient for AlwaysDeliver {
        async fn approve(&self, _channel: &Channel, _content: &[u8]) -> courier_backend::Result<Approval> {
            unreachable!("dispatcher tests only exercise delivery")
        }

        async fn deliver(&self, _channel: &Channel, content: &[u8]) -> courier_backend::Result<()> {
            if content == b"reject" {
                return Err(BackendError::Failed("nope".into()));
            }
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

    #[tokio::test]
    async fn delivers_a_due_message_and_marks_it_sent() {
        let queue = Arc::new(MemoryQueue::new());
        let store = MessageStore::open_temporary();
        let registry = Arc::new(MemoryRegistry::new());
        let backend = Arc::new(AlwaysDeliver);

        registry.register(&channel()).await.unwrap();

        let id = MessageId::generate_at(Duration::from_millis(1));
        store.add(&Message::pending(id, "sms".into(), "twilio".into(), b"hi".to_vec())).unwrap();

        let dispatcher = Dispatcher::new(Arc::clone(&queue), store.clone(), registry, backend);
        let handle = dispatcher.handle();
        let (tx, rx) = broadcast::channel(1);

        let run = tokio::spawn(dispatcher.run(rx));
        queue.push(id).await.unwrap();
        handle.wake();

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(Signal::Shutdown).unwrap();
        run.await.unwrap().unwrap();

        assert_eq!(store.get(id).unwrap().status, courier_common::Status::Sent);
    }

    #[tokio::test]
    async fn a_failed_approval_backend_marks_failed_deliver() {
        let queue = Arc::new(MemoryQueue::new());
        let store = MessageStore::open_temporary();
        let registry = Arc::new(MemoryRegistry::new());
        let backend = Arc::new(AlwaysDeliver);

        registry.register(&channel()).await.unwrap();

        let id = MessageId::generate_at(Duration::from_millis(1));
        store
            .add(&Message::pending(id, "sms".into(), "twilio".into(), b"reject".to_vec()))
            .unwrap();

        let dispatcher = Dispatcher::new(Arc::clone(&queue), store.clone(), registry, backend);
        let handle = dispatcher.handle();
        let (tx, rx) = broadcast::channel(1);

        let run = tokio::spawn(dispatcher.run(rx));
        queue.push(id).await.unwrap();
        handle.wake();

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(Signal::Shutdown).unwrap();
        run.await.unwrap().unwrap();

        assert_eq!(store.get(id).unwrap().status, courier_common::Status::FailedDeliver);
    }

    #[tokio::test]
    async fn two_dispatchers_never_pop_the_same_id() {
        // A single MemoryQueue shared by two dispatcher loops models two
        // scheduler processes racing over the same shared store.
        let queue = Arc::new(MemoryQueue::new());
        for i in 0..20u32 {
            queue
                .push(MessageId::generate_at(Duration::from_millis(u64::from(i))))
                .await
                .unwrap();
        }

        let mut seen = std::collections::HashSet::new();
        loop {
            let (a, b) = tokio::join!(queue.pop(), queue.pop());
            let popped = [a.unwrap(), b.unwrap()];
            let before = seen.len();
            let unique: Vec<_> = popped.into_iter().flatten().collect();
            for id in &unique {
                seen.insert(*id);
            }
            assert_eq!(seen.len(), before + unique.len(), "no id popped twice");
            if unique.is_empty() {
                break;
            }
        }
        assert_eq!(seen.len(), 20);
    }
}
