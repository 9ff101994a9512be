//! Built-in capabilities backed by a chat model.

use std::sync::Arc;

use async_trait::async_trait;
use llm::{ChatModel, ChatRequest};
use researcher_core::value_to_text;
use serde_json::Value;
use tracing::{debug, info};

use crate::arxiv::{ArxivClient, SearchPapersCapability, SEARCH_PAPERS, SEMANTIC_RERANK};
use crate::prompts::ResearchPrompts;
use crate::registry::{
    Capability, CapabilityInputs, CapabilityOutput, CapabilityRegistry, CapabilityResult,
};

/// Returned instead of calling the model when there is no input text.
pub const NO_INPUT_TEXT: &str = "No input text provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Summarize,
    KeyInsights,
    ResearchQuestions,
}

impl PromptKind {
    /// Task name the capability is registered under.
    pub fn task_name(&self) -> &'static str {
        match self {
            PromptKind::Summarize => "summarize_papers",
            PromptKind::KeyInsights => "extract_key_insights",
            PromptKind::ResearchQuestions => "generate_research_questions",
        }
    }

    pub fn all() -> [PromptKind; 3] {
        [
            PromptKind::Summarize,
            PromptKind::KeyInsights,
            PromptKind::ResearchQuestions,
        ]
    }

    fn prompt(&self, text: &str) -> String {
        match self {
            PromptKind::Summarize => ResearchPrompts::summarize(text),
            PromptKind::KeyInsights => ResearchPrompts::key_insights(text),
            PromptKind::ResearchQuestions => ResearchPrompts::research_questions(text),
        }
    }
}

/// Flatten capability inputs into prompt text.
///
/// A `text` input wins outright; otherwise every non-null input is rendered
/// and joined by blank lines.
pub fn input_text(inputs: &CapabilityInputs) -> String {
    if let Some(text) = inputs.get("text").filter(|v| !v.is_null()) {
        return value_to_text(text);
    }

    inputs
        .values()
        .filter(|v| !v.is_null())
        .map(value_to_text)
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Sends the task's input text through one fixed prompt and returns the reply.
pub struct PromptCapability {
    model: Arc<dyn ChatModel>,
    kind: PromptKind,
}

impl PromptCapability {
    pub fn new(model: Arc<dyn ChatModel>, kind: PromptKind) -> Self {
        Self { model, kind }
    }
}

#[async_trait]
impl Capability for PromptCapability {
    async fn call(&self, inputs: CapabilityInputs) -> CapabilityResult {
        let text = input_text(&inputs);
        if text.trim().is_empty() {
            debug!(task = %self.kind.task_name(), "No input text, skipping model call");
            return Ok(CapabilityOutput::text(NO_INPUT_TEXT));
        }

        info!(task = %self.kind.task_name(), text_len = text.len(), "Calling model");
        let reply = self
            .model
            .generate(ChatRequest::new(self.kind.prompt(&text)))
            .await?;
        Ok(CapabilityOutput::Value(Value::String(reply)))
    }
}

/// Names [`builtin_registry`] registers, sorted.
pub fn builtin_task_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PromptKind::all().iter().map(|k| k.task_name()).collect();
    names.extend([SEARCH_PAPERS, SEMANTIC_RERANK]);
    names.sort_unstable();
    names
}

/// Registry with arXiv search (also reachable as `semantic_rerank`) and every
/// model-backed capability, each under its task name.
pub fn builtin_registry(model: Arc<dyn ChatModel>, papers: ArxivClient) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new().with(
        SEARCH_PAPERS,
        Arc::new(SearchPapersCapability::new(papers)),
    );
    registry.alias(SEMANTIC_RERANK, SEARCH_PAPERS);

    for kind in PromptKind::all() {
        registry.register(
            kind.task_name(),
            Arc::new(PromptCapability::new(Arc::clone(&model), kind)),
        );
    }
    registry
}
