use researcher_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid run phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Planning failed: {0}")]
    PlanningFailed(String),

    #[error("Capability for task '{task}' failed: {reason}")]
    CapabilityFailed { task: String, reason: String },

    #[error("Review of task '{task}' failed: {reason}")]
    ReviewFailed { task: String, reason: String },

    #[error("Invalid plan: {0}")]
    Core(#[from] CoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OrchestratorError {
    pub fn capability_failed(task: impl Into<String>, reason: impl ToString) -> Self {
        Self::CapabilityFailed {
            task: task.into(),
            reason: reason.to_string(),
        }
    }

    pub fn review_failed(task: impl Into<String>, reason: impl ToString) -> Self {
        Self::ReviewFailed {
            task: task.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
