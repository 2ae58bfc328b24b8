//! Event bus for session presenters
//!
//! Tokio broadcast channel; slow subscribers lag rather than block the
//! session loop.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::CourtEvent;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Error type for event bus operations
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Subscriber lagged, {0} events skipped")]
    Lagged(u64),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// Broadcast bus for [`CourtEvent`]s
pub struct EventBus {
    sender: broadcast::Sender<CourtEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers; no subscribers is fine.
    pub fn publish(&self, event: CourtEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => debug!(event_type, receivers = count, "Event published"),
            Err(_) => debug!(event_type, "Event published (no receivers)"),
        }
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of the bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<CourtEvent>,
}

impl EventSubscriber {
    /// Wait for the next event
    pub async fn recv(&mut self) -> EventBusResult<CourtEvent> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Lagged(n) => EventBusError::Lagged(n),
            broadcast::error::RecvError::Closed => EventBusError::ChannelClosed,
        })
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<CourtEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Drain every queued event
    pub fn drain(&mut self) -> Vec<CourtEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
