use serde::{Deserialize, Serialize};

/// What to do when a capability or the reviewer errors mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run and surface the error.
    #[default]
    Abort,
    /// Record the failure on the task's log entry and carry on.
    Isolate,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Abort => "abort",
            FailurePolicy::Isolate => "isolate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub review_each_task: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            review_each_task: true,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_review(mut self, review_each_task: bool) -> Self {
        self.review_each_task = review_each_task;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
