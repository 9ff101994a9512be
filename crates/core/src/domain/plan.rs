use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::Task;
use crate::error::{CoreError, Result};

/// A validated, non-empty sequence of uniquely named tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<Task>", into = "Vec<Task>")]
pub struct Plan {
    tasks: Vec<Task>,
}

impl Plan {
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        if tasks.is_empty() {
            return Err(CoreError::EmptyPlan);
        }

        let mut seen = HashSet::with_capacity(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            if task.name.trim().is_empty() {
                return Err(CoreError::EmptyTaskName { index });
            }
            if !seen.insert(task.name.as_str()) {
                return Err(CoreError::DuplicateTask(task.name.clone()));
            }
        }

        Ok(Self { tasks })
    }

    /// Validate a JSON-shaped planner result.
    ///
    /// The value must be an array whose every element deserializes into a
    /// [`Task`]; anything else is rejected with the offending index.
    pub fn from_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(CoreError::NotASequence(json_kind(&other).to_string())),
        };

        let tasks = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<Task>(item).map_err(|e| CoreError::InvalidTask {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(tasks)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }
}

impl TryFrom<Vec<Task>> for Plan {
    type Error = CoreError;

    fn try_from(tasks: Vec<Task>) -> Result<Self> {
        Self::new(tasks)
    }
}

impl From<Plan> for Vec<Task> {
    fn from(plan: Plan) -> Self {
        plan.tasks
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
