//! Run lifecycle events for the research orchestrator.
//!
//! The orchestrator publishes an [`Event`] for each step of a run. Observers
//! subscribe through [`EventBus`], either to everything or to one run.

mod bus;
mod types;

pub use bus::{EventBus, RunSubscription};
pub use types::*;
