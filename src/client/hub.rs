use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{timeout_at, Instant};

use crate::events::Event;
use crate::state::World;

const CHANNEL_CAPACITY: usize = 1024;

/// Fan-out point for inbound events.
///
/// `dispatch` updates the `World` mirror first and only then notifies
/// listeners, so anyone woken by an event sees state that already includes it.
pub struct EventHub {
    world: World,
    tx: broadcast::Sender<Event>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            world: World::new(),
            tx,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn dispatch(&self, event: Event) {
        self.world.apply(&event);
        // No listeners is fine
        let _ = self.tx.send(event);
    }

    /// Start listening. Register before sending whatever triggers the reply.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A one-shot listener. Dropping it deregisters it.
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Wait up to `limit` for the first event `filter` accepts.
    ///
    /// Returns `None` on timeout or when the hub is gone. Events the filter
    /// rejects are discarded.
    pub async fn next_matching<T, F>(&mut self, limit: Duration, filter: F) -> Option<T>
    where
        F: FnMut(&Event) -> Option<T>,
    {
        self.next_matching_until(Instant::now() + limit, filter).await
    }

    /// Same as `next_matching` with an absolute deadline, so several waits
    /// can share one overall timeout.
    pub async fn next_matching_until<T, F>(&mut self, deadline: Instant, mut filter: F) -> Option<T>
    where
        F: FnMut(&Event) -> Option<T>,
    {
        let rx = &mut self.rx;
        let wait = async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(found) = filter(&event) {
                            return Some(found);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        };
        timeout_at(deadline, wait).await.ok().flatten()
    }
}
