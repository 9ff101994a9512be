//! Name-keyed table of executable capabilities.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Named inputs resolved from run state; missing keys arrive as `null`.
pub type CapabilityInputs = Map<String, Value>;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("LLM error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Failed(String),
}

pub type CapabilityResult = std::result::Result<CapabilityOutput, CapabilityError>;

/// What a capability hands back to the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityOutput {
    /// Stored under the task's own name.
    Value(Value),
    /// Each pair merged into run state.
    Map(Map<String, Value>),
}

impl CapabilityOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Value(Value::String(text.into()))
    }

    pub fn outputs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Value> for CapabilityOutput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// A unit of executable work addressed by task name.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn call(&self, inputs: CapabilityInputs) -> CapabilityResult;
}

/// Adapter turning a synchronous closure into a [`Capability`].
pub struct FnCapability<F> {
    func: F,
}

impl<F> FnCapability<F>
where
    F: Fn(CapabilityInputs) -> CapabilityResult + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Capability for FnCapability<F>
where
    F: Fn(CapabilityInputs) -> CapabilityResult + Send + Sync,
{
    async fn call(&self, inputs: CapabilityInputs) -> CapabilityResult {
        (self.func)(inputs)
    }
}

#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability, replacing any previous one under that name.
    pub fn register(&mut self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        self.entries.insert(name.into(), capability);
    }

    pub fn with(mut self, name: impl Into<String>, capability: Arc<dyn Capability>) -> Self {
        self.register(name, capability);
        self
    }

    /// Make `alias` resolve to whatever is registered under `target`.
    ///
    /// Returns false when `target` is unknown.
    pub fn alias(&mut self, alias: impl Into<String>, target: &str) -> bool {
        match self.entries.get(target).cloned() {
            Some(capability) => {
                self.entries.insert(alias.into(), capability);
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("names", &self.names())
            .finish()
    }
}
