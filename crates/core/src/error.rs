use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Plan is empty")]
    EmptyPlan,

    #[error("Plan must be a JSON array of tasks, got {0}")]
    NotASequence(String),

    #[error("Task #{index} is malformed: {reason}")]
    InvalidTask { index: usize, reason: String },

    #[error("Task #{index} has an empty name")]
    EmptyTaskName { index: usize },

    #[error("Duplicate task name in plan: {0}")]
    DuplicateTask(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CoreError::DuplicateTask("search_papers".to_string());
        assert!(error.to_string().contains("search_papers"));

        let error = CoreError::InvalidTask {
            index: 2,
            reason: "missing field `name`".to_string(),
        };
        assert!(error.to_string().contains("#2"));
    }
}
