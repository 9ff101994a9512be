//! Chat-completion access for the research orchestrator.
//!
//! - **ChatModel**: the trait planners, reviewers and prompt capabilities call
//! - **ChatClient**: OpenAI-compatible HTTP implementation (Groq, OpenRouter)
//! - **LlmConfig**: provider, model and generation defaults

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod types;

pub use client::{ChatClient, RetryPolicy};
pub use config::{LlmConfig, Provider};
pub use error::{LlmError, LlmResult};
pub use model::{ChatModel, ChatRequest};
pub use types::{ChatMessage, Role};
