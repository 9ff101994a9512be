//! Event types for the research run lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// Position in the emitting run's event stream
    pub sequence: u64,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self::with_sequence(event, 0)
    }

    pub fn with_sequence(event: Event, sequence: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All possible events in the system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Run events
    /// A run was started for a query
    #[serde(rename = "run.started")]
    RunStarted { run_id: Uuid, query: String },

    /// The planner returned a valid plan
    #[serde(rename = "plan.received")]
    PlanReceived { run_id: Uuid, task_count: usize },

    /// The planner failed; the run stops here
    #[serde(rename = "plan.failed")]
    PlanFailed { run_id: Uuid, reason: String },

    /// Execution order was fixed
    #[serde(rename = "plan.scheduled")]
    PlanScheduled {
        run_id: Uuid,
        order: Vec<String>,
        degraded: Vec<String>,
    },

    // Task events
    /// A task began executing
    #[serde(rename = "task.started")]
    TaskStarted {
        run_id: Uuid,
        task: String,
        position: usize,
    },

    /// A task finished and merged its outputs
    #[serde(rename = "task.completed")]
    TaskCompleted {
        run_id: Uuid,
        task: String,
        produced: Vec<String>,
    },

    /// No capability was registered for the task
    #[serde(rename = "task.skipped")]
    TaskSkipped { run_id: Uuid, task: String },

    /// The task's capability errored
    #[serde(rename = "task.failed")]
    TaskFailed {
        run_id: Uuid,
        task: String,
        error: String,
    },

    /// A review was attached to the task's output
    #[serde(rename = "task.reviewed")]
    TaskReviewed {
        run_id: Uuid,
        task: String,
        issue_count: usize,
        quality_score: f64,
    },

    /// The run reached its end
    #[serde(rename = "run.completed")]
    RunCompleted { run_id: Uuid, task_count: usize },

    // System events
    /// Generic error event
    #[serde(rename = "error")]
    Error {
        message: String,
        context: Option<String>,
    },
}

impl Event {
    /// Get the run ID associated with this event, if any
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            Event::RunStarted { run_id, .. }
            | Event::PlanReceived { run_id, .. }
            | Event::PlanFailed { run_id, .. }
            | Event::PlanScheduled { run_id, .. }
            | Event::TaskStarted { run_id, .. }
            | Event::TaskCompleted { run_id, .. }
            | Event::TaskSkipped { run_id, .. }
            | Event::TaskFailed { run_id, .. }
            | Event::TaskReviewed { run_id, .. }
            | Event::RunCompleted { run_id, .. } => Some(*run_id),
            Event::Error { .. } => None,
        }
    }

    /// Get the task name associated with this event, if any
    pub fn task(&self) -> Option<&str> {
        match self {
            Event::TaskStarted { task, .. }
            | Event::TaskCompleted { task, .. }
            | Event::TaskSkipped { task, .. }
            | Event::TaskFailed { task, .. }
            | Event::TaskReviewed { task, .. } => Some(task),
            _ => None,
        }
    }
}
