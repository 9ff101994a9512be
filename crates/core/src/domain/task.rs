use serde::{Deserialize, Deserializer, Serialize};

/// One named unit of work in a research plan.
///
/// Planners are free to omit any field except `name`; list fields that are
/// missing or `null` deserialize as empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable_list")]
    pub required_inputs: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub expected_outputs: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub dependencies: Vec<String>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required_inputs: Vec::new(),
            expected_outputs: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// State key under which this task's review result is stored.
    pub fn review_key(&self) -> String {
        review_key_for(&self.name)
    }
}

pub fn review_key_for(task_name: &str) -> String {
    format!("{}_review", task_name)
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("summarize_papers")
            .with_description("Summarize the fetched papers")
            .with_inputs(["papers"])
            .with_outputs(["summaries"])
            .depends_on(["search_papers"]);

        assert_eq!(task.name, "summarize_papers");
        assert_eq!(task.required_inputs, vec!["papers".to_string()]);
        assert_eq!(task.expected_outputs, vec!["summaries".to_string()]);
        assert_eq!(task.dependencies, vec!["search_papers".to_string()]);
    }

    #[test]
    fn test_task_deserialize_minimal() {
        let task: Task = serde_json::from_str(r#"{"name": "search_papers"}"#).unwrap();
        assert_eq!(task.name, "search_papers");
        assert!(task.description.is_empty());
        assert!(task.required_inputs.is_empty());
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn test_task_deserialize_null_lists() {
        let json = r#"{"name": "a", "description": null, "dependencies": null, "expected_outputs": ["x"]}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(task.dependencies.is_empty());
        assert_eq!(task.expected_outputs, vec!["x".to_string()]);
    }

    #[test]
    fn test_review_key() {
        assert_eq!(Task::new("search_papers").review_key(), "search_papers_review");
    }
}
