//! Sequenced publishing of run lifecycle events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use events::{Event, EventBus, EventEnvelope};

/// Wraps an [`EventBus`] and stamps each envelope with the next sequence
/// number, so subscribers can order events from one run.
#[derive(Clone, Debug)]
pub struct OrderedEventEmitter {
    bus: EventBus,
    sequence: Arc<AtomicU64>,
}

impl OrderedEventEmitter {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish `event`; returns the sequence number it was given.
    pub fn emit(&self, event: Event) -> u64 {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.bus.publish(EventEnvelope::with_sequence(event, seq));
        seq
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}
