//! Planners turn a research query into an unvalidated task list.

use std::sync::Arc;

use async_trait::async_trait;
use llm::{ChatModel, ChatRequest};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{OrchestratorError, Result};
use crate::parsing;
use crate::prompts::ResearchPrompts;

const PLANNER_TEMPERATURE: f32 = 0.2;
const PLANNER_MAX_TOKENS: u32 = 800;

/// Produces the JSON task list for a query.
///
/// The orchestrator validates whatever comes back; an error here or an
/// invalid value both end the run as a planning failure.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, query: &str) -> Result<Value>;
}

/// Returns the same value for every query.
#[derive(Debug, Clone)]
pub struct StaticPlanner {
    value: Value,
}

impl StaticPlanner {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

#[async_trait]
impl Planner for StaticPlanner {
    async fn plan(&self, _query: &str) -> Result<Value> {
        Ok(self.value.clone())
    }
}

/// Asks a chat model for the plan.
pub struct LlmPlanner {
    model: Arc<dyn ChatModel>,
    known_tasks: Vec<String>,
}

impl LlmPlanner {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            known_tasks: Vec::new(),
        }
    }

    /// Hint the model toward task names that have registered capabilities.
    pub fn with_known_tasks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_tasks = names.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, query: &str) -> Result<Value> {
        let known: Vec<&str> = self.known_tasks.iter().map(String::as_str).collect();
        let request = ChatRequest::new(ResearchPrompts::planner(query, &known))
            .with_system(ResearchPrompts::planner_system())
            .with_temperature(PLANNER_TEMPERATURE)
            .with_max_tokens(PLANNER_MAX_TOKENS);

        info!(query = %query, "Requesting plan");
        let response = self.model.generate(request).await?;
        debug!(response_len = response.len(), "Planner responded");

        parsing::parse_json_response(&response)
            .map_err(|e| OrchestratorError::PlanningFailed(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use llm::LlmResult;
    use serde_json::json;
    use std::sync::Mutex;

    /// Chat model returning canned replies and recording requests.
    pub(crate) struct CannedModel {
        reply: String,
        pub(crate) requests: Mutex<Vec<ChatRequest>>,
    }

    impl CannedModel {
        pub(crate) fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn generate(&self, request: ChatRequest) -> LlmResult<String> {
            self.requests.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_llm_planner_parses_fenced_plan() {
        let model = Arc::new(CannedModel::new(
            "```json\n[{\"name\": \"search_papers\"}]\n```",
        ));
        let planner = LlmPlanner::new(model.clone()).with_known_tasks(["search_papers"]);

        let value = planner.plan("rag hallucinations").await.unwrap();
        assert_eq!(value, json!([{"name": "search_papers"}]));

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, Some(0.2));
        assert_eq!(requests[0].max_tokens, Some(800));
        assert!(requests[0].system_prompt.is_some());
        assert!(requests[0].prompt.contains("rag hallucinations"));
    }

    #[tokio::test]
    async fn test_llm_planner_rejects_prose() {
        let planner = LlmPlanner::new(Arc::new(CannedModel::new("I would search first.")));
        let err = planner.plan("q").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::PlanningFailed(_)));
    }

    #[tokio::test]
    async fn test_static_planner() {
        let planner = StaticPlanner::new(json!([{"name": "a"}]));
        assert_eq!(planner.plan("anything").await.unwrap(), json!([{"name": "a"}]));
    }
}
