use std::sync::Arc;

use async_trait::async_trait;
use llm::{ChatModel, ChatRequest};
use tracing::debug;

use crate::error::Result;
use crate::prompts::ResearchPrompts;

/// Critiques a task's output. Returns the raw reply; the review gate parses it.
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn critique(&self, task_name: &str, text: &str) -> Result<String>;
}

pub struct LlmReviewer {
    model: Arc<dyn ChatModel>,
}

impl LlmReviewer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Reviewer for LlmReviewer {
    async fn critique(&self, task_name: &str, text: &str) -> Result<String> {
        let prompt = ResearchPrompts::review(task_name, text);
        debug!(task = %task_name, prompt_len = prompt.len(), "Requesting review");
        Ok(self.model.generate(ChatRequest::new(prompt)).await?)
    }
}
