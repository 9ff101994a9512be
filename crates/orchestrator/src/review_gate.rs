//! Post-execution critique of a task's output.

use std::sync::Arc;

use researcher_core::{value_to_text, ReviewResult, RunState, Task};
use tracing::{debug, info};

use crate::error::Result;
use crate::parsing;
use crate::reviewer::Reviewer;

/// Text the reviewer sees for `task`.
///
/// The task's declared outputs that exist in state, joined by blank lines;
/// without declared outputs, whatever is stored under the task's own name.
pub fn review_text(task: &Task, state: &RunState) -> String {
    if task.expected_outputs.is_empty() {
        return state.text(&task.name).unwrap_or_default();
    }

    task.expected_outputs
        .iter()
        .filter_map(|key| state.get(key))
        .map(value_to_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Clone)]
pub struct ReviewGate {
    reviewer: Arc<dyn Reviewer>,
}

impl ReviewGate {
    pub fn new(reviewer: Arc<dyn Reviewer>) -> Self {
        Self { reviewer }
    }

    /// Critique `text`. Unparsable replies become the fallback result.
    pub async fn review(&self, task_name: &str, text: &str) -> Result<ReviewResult> {
        let reply = self.reviewer.critique(task_name, text).await?;
        let result = parsing::parse_review_response(&reply).into_result(text);

        info!(
            task = %task_name,
            issues = result.issues_found.len(),
            quality_score = result.quality_score,
            "Review complete"
        );
        Ok(result)
    }

    /// Review `task`'s output and store the result under `<task>_review`.
    ///
    /// Returns `None` without calling the reviewer when there is nothing to
    /// review.
    pub async fn review_task(&self, task: &Task, state: &mut RunState) -> Result<Option<ReviewResult>> {
        let text = review_text(task, state);
        if text.trim().is_empty() {
            debug!(task = %task.name, "Nothing to review");
            return Ok(None);
        }

        let result = self.review(&task.name, &text).await?;
        state.insert(task.review_key(), result.to_value());
        Ok(Some(result))
    }
}

impl std::fmt::Debug for ReviewGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewGate").finish_non_exhaustive()
    }
}
