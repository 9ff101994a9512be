//! Domain types shared by the research orchestrator crates.
//!
//! Everything here is plain data: tasks and plans as produced by a planner,
//! the per-run key/value state, the audit log, and review records.

pub mod domain;
pub mod error;

pub use domain::plan::Plan;
pub use domain::review::{ReviewResult, FALLBACK_QUALITY_SCORE, PARSE_FAILURE_ISSUE};
pub use domain::run::{
    LogEntry, PlannerFailure, ReviewSummary, RunOutcome, RunReport, TaskRunStatus, PLANNER_FAILED,
};
pub use domain::state::{value_to_text, RunState};
pub use domain::task::{review_key_for, Task};
pub use error::{CoreError, Result};
