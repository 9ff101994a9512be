//! Broadcast bus for run lifecycle events

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::types::EventEnvelope;

const DEFAULT_CAPACITY: usize = 1000;

/// Fan-out of [`EventEnvelope`]s to any number of observers.
///
/// Publishing never blocks. A subscriber that falls more than `capacity`
/// events behind loses the oldest ones.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    published: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns how many subscribers received the envelope (0 when nobody listens).
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Receiver that only yields events belonging to `run_id`.
    pub fn subscribe_run(&self, run_id: Uuid) -> RunSubscription {
        RunSubscription {
            run_id,
            receiver: self.sender.subscribe(),
            missed: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events published, whether or not anyone received them.
    pub fn event_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .field("event_count", &self.event_count())
            .finish()
    }
}

/// Events of a single run, in publish order.
pub struct RunSubscription {
    run_id: Uuid,
    receiver: broadcast::Receiver<EventEnvelope>,
    missed: u64,
}

impl RunSubscription {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Events dropped because this subscription lagged behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Next event of the run. `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.event.run_id() == Some(self.run_id) => {
                    return Some(envelope)
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => self.missed += n,
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next event of the run if one is already buffered.
    pub fn try_next(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if envelope.event.run_id() == Some(self.run_id) => {
                    return Some(envelope)
                }
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(n)) => self.missed += n,
                Err(_) => return None,
            }
        }
    }
}
