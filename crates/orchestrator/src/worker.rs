//! Single-task execution against run state.

use std::sync::Arc;

use researcher_core::{RunState, Task};
use tracing::{debug, info, warn};

use crate::config::FailurePolicy;
use crate::error::{OrchestratorError, Result};
use crate::registry::{CapabilityInputs, CapabilityOutput, CapabilityRegistry};

/// How a single task execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Outputs were merged; `produced` lists keys that did not exist before.
    Completed { produced: Vec<String> },
    /// Nothing is registered under the task's name.
    Skipped,
    /// The capability errored under [`FailurePolicy::Isolate`].
    Failed { error: String },
}

impl WorkerOutcome {
    pub fn produced(&self) -> &[String] {
        match self {
            WorkerOutcome::Completed { produced } => produced,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Worker {
    registry: Arc<CapabilityRegistry>,
    failure_policy: FailurePolicy,
}

impl Worker {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run `task`'s capability and merge what it returns into `state`.
    ///
    /// Errors only under [`FailurePolicy::Abort`]; state is left untouched
    /// when the capability fails.
    pub async fn execute(&self, task: &Task, state: &mut RunState) -> Result<WorkerOutcome> {
        let Some(capability) = self.registry.lookup(&task.name) else {
            warn!(task = %task.name, "Unknown task, no capability registered");
            return Ok(WorkerOutcome::Skipped);
        };

        let inputs: CapabilityInputs = task
            .required_inputs
            .iter()
            .map(|key| (key.clone(), state.get_or_null(key)))
            .collect();

        info!(task = %task.name, inputs = inputs.len(), "Running task");
        debug!(task = %task.name, keys = ?task.required_inputs, "Resolved task inputs");

        let output = match capability.call(inputs).await {
            Ok(output) => output,
            Err(e) => {
                return match self.failure_policy {
                    FailurePolicy::Abort => Err(OrchestratorError::capability_failed(&task.name, e)),
                    FailurePolicy::Isolate => {
                        warn!(task = %task.name, error = %e, "Capability failed, continuing");
                        Ok(WorkerOutcome::Failed {
                            error: e.to_string(),
                        })
                    }
                };
            }
        };

        let before = state.key_set();
        match output {
            CapabilityOutput::Map(pairs) => {
                for (key, value) in pairs {
                    state.insert(key, value);
                }
            }
            CapabilityOutput::Value(value) => {
                state.insert(task.name.clone(), value);
            }
        }

        let produced: Vec<String> = state.key_set().difference(&before).cloned().collect();
        info!(task = %task.name, produced = produced.len(), "Task completed");

        Ok(WorkerOutcome::Completed { produced })
    }

    /// Execute `tasks` in the order given, without scheduling or review.
    pub async fn run_plan(&self, tasks: &[Task], initial_state: RunState) -> Result<RunState> {
        let mut state = initial_state;
        for task in tasks {
            self.execute(task, &mut state).await?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CapabilityError, FnCapability};
    use serde_json::{json, Value};

    fn registry() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        registry.register(
            "search_papers",
            Arc::new(FnCapability::new(|inputs: CapabilityInputs| {
                let query = inputs.get("query").cloned().unwrap_or(Value::Null);
                Ok(CapabilityOutput::outputs([
                    ("papers", json!(["p1", "p2"])),
                    ("search_query", query),
                ]))
            })),
        );
        registry.register(
            "summarize_papers",
            Arc::new(FnCapability::new(|inputs: CapabilityInputs| {
                Ok(CapabilityOutput::text(format!("summary of {}", inputs["papers"])))
            })),
        );
        registry.register(
            "broken",
            Arc::new(FnCapability::new(|_| {
                Err(CapabilityError::Failed("upstream timeout".into()))
            })),
        );
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_mapping_output_merges_and_reports_new_keys() {
        let worker = Worker::new(registry());
        let mut state: RunState = [("query", "rag"), ("search_query", "old")]
            .into_iter()
            .collect();

        let task = Task::new("search_papers").with_inputs(["query"]);
        let outcome = worker.execute(&task, &mut state).await.unwrap();

        assert_eq!(outcome.produced(), &["papers".to_string()]);
        assert_eq!(state.get("papers"), Some(&json!(["p1", "p2"])));
        assert_eq!(state.get("search_query"), Some(&json!("rag")));
    }

    #[tokio::test]
    async fn test_scalar_output_stored_under_task_name() {
        let worker = Worker::new(registry());
        let mut state: RunState = [("papers", json!(["p1"]))].into_iter().collect();

        let task = Task::new("summarize_papers").with_inputs(["papers"]);
        let outcome = worker.execute(&task, &mut state).await.unwrap();

        assert_eq!(outcome.produced(), &["summarize_papers".to_string()]);
        assert_eq!(
            state.get("summarize_papers"),
            Some(&json!(r#"summary of ["p1"]"#))
        );
    }

    #[tokio::test]
    async fn test_missing_input_is_null() {
        let worker = Worker::new(registry());
        let mut state = RunState::new();

        let task = Task::new("summarize_papers").with_inputs(["papers"]);
        worker.execute(&task, &mut state).await.unwrap();

        assert_eq!(state.get("summarize_papers"), Some(&json!("summary of null")));
    }

    #[tokio::test]
    async fn test_unknown_task_is_skipped() {
        let worker = Worker::new(registry());
        let mut state: RunState = [("query", "rag")].into_iter().collect();
        let before = state.clone();

        let outcome = worker
            .execute(&Task::new("fetch_pdfs"), &mut state)
            .await
            .unwrap();

        assert_eq!(outcome, WorkerOutcome::Skipped);
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_failure_policies() {
        let task = Task::new("broken");

        let mut state = RunState::new();
        let err = Worker::new(registry())
            .execute(&task, &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::CapabilityFailed { ref task, .. } if task == "broken"));

        let outcome = Worker::new(registry())
            .with_failure_policy(FailurePolicy::Isolate)
            .execute(&task, &mut state)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WorkerOutcome::Failed {
                error: "upstream timeout".to_string()
            }
        );
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_run_plan_executes_in_given_order() {
        let worker = Worker::new(registry());
        let tasks = vec![
            Task::new("search_papers").with_inputs(["query"]),
            Task::new("summarize_papers").with_inputs(["papers"]),
        ];
        let initial: RunState = [("query", "rag")].into_iter().collect();

        let state = worker.run_plan(&tasks, initial).await.unwrap();

        assert_eq!(
            state.get("summarize_papers"),
            Some(&json!(r#"summary of ["p1","p2"]"#))
        );
    }
}
