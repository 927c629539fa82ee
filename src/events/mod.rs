//! In-process publish/subscribe fan-out for monitor lifecycle events.
//!
//! Built on `tokio::sync::broadcast`, which gives exactly the delivery
//! contract the scheduler needs: every subscriber consumes independently from
//! a bounded buffer, a slow subscriber lags and loses the oldest events
//! instead of blocking publication, and events from one publisher are
//! observed in publication order. There is no replay: a subscriber only sees
//! events published after it subscribed.

use tokio::sync::broadcast;

use crate::models::event::MonitorEvent;

/// Fans lifecycle events out to all current subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

/// A live subscription to the event bus. Dropping it unsubscribes.
pub struct EventStream {
    receiver: broadcast::Receiver<MonitorEvent>,
}

impl EventBus {
    /// Creates a bus whose per-subscriber buffer holds `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Registers a new subscriber. Only events published from this point on
    /// are delivered.
    pub fn subscribe(&self) -> EventStream {
        EventStream { receiver: self.sender.subscribe() }
    }

    /// Publishes an event to all current subscribers. Never blocks; with no
    /// subscribers the event is simply dropped.
    pub fn publish(&self, event: MonitorEvent) {
        let receivers = self.sender.receiver_count();
        tracing::trace!(?event, receivers, "Publishing lifecycle event.");
        // send only errors when there are no receivers, which is fine.
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventStream {
    /// Receives the next event.
    ///
    /// When this subscriber lagged behind and lost events, the gap is skipped
    /// silently and the oldest retained event is returned; the dashboard
    /// re-fetches authoritative state, so a lost live-status event is
    /// tolerable. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event subscriber lagged; dropping oldest events.");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
