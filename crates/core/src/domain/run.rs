use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::RunState;

/// Error marker returned when the planner produced nothing usable.
pub const PLANNER_FAILED: &str = "planner_failed";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskRunStatus {
    #[default]
    Completed,
    /// No capability is registered under the task's name.
    Skipped,
    /// The capability errored and the run was configured to carry on.
    Failed,
}

impl TaskRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewSummary {
    pub key: String,
    pub issues: Vec<String>,
}

/// Audit record for one executed task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub task: String,
    #[serde(default)]
    pub status: TaskRunStatus,
    pub produced: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEntry {
    pub fn completed(task: impl Into<String>, produced: Vec<String>) -> Self {
        Self {
            task: task.into(),
            status: TaskRunStatus::Completed,
            produced,
            review: None,
            error: None,
        }
    }

    pub fn skipped(task: impl Into<String>) -> Self {
        Self {
            status: TaskRunStatus::Skipped,
            ..Self::completed(task, Vec::new())
        }
    }

    pub fn failed(task: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: TaskRunStatus::Failed,
            error: Some(error.into()),
            ..Self::completed(task, Vec::new())
        }
    }

    pub fn with_review(mut self, key: impl Into<String>, issues: Vec<String>) -> Self {
        self.review = Some(ReviewSummary {
            key: key.into(),
            issues,
        });
        self
    }
}

/// Result of a run that got past planning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub query: String,
    pub state: RunState,
    pub run_log: Vec<LogEntry>,
    /// Task names in execution order.
    pub tasks: Vec<String>,
    /// Tasks scheduled without an ordering guarantee (cycles, dangling deps).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn entry(&self, task: &str) -> Option<&LogEntry> {
        self.run_log.iter().find(|e| e.task == task)
    }

    pub fn count_with_status(&self, status: TaskRunStatus) -> usize {
        self.run_log.iter().filter(|e| e.status == status).count()
    }
}

/// Result of a run that never left planning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerFailure {
    pub error: String,
    pub state: RunState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PlannerFailure {
    pub fn new(state: RunState, reason: Option<String>) -> Self {
        Self {
            error: PLANNER_FAILED.to_string(),
            state,
            reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RunOutcome {
    Completed(RunReport),
    PlannerFailed(PlannerFailure),
}

impl RunOutcome {
    pub fn state(&self) -> &RunState {
        match self {
            Self::Completed(report) => &report.state,
            Self::PlannerFailed(failure) => &failure.state,
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::PlannerFailed(_) => None,
        }
    }

    pub fn into_report(self) -> Option<RunReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::PlannerFailed(_) => None,
        }
    }

    pub fn is_planner_failure(&self) -> bool {
        matches!(self, Self::PlannerFailed(_))
    }
}
