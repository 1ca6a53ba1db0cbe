use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    /// Publish an event, returning how many subscribers received it.
    ///
    /// Never awaits, so callers may publish while holding a lock.
    fn publish(&self, event: E) -> usize;
    fn subscribe(&self) -> broadcast::Receiver<E>;
    fn subscriber_count(&self) -> usize;
}

/// In-memory broadcast bus.
///
/// Publishing with no live subscribers is not an error: the event is simply
/// dropped, the way a DOM mutation with no observer goes unnoticed.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }
}

impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    fn publish(&self, event: E) -> usize {
        match self.sender.send(event) {
            Ok(delivered) => delivered,
            Err(broadcast::error::SendError(dropped)) => {
                trace!(?dropped, "no subscribers; event dropped");
                0
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
