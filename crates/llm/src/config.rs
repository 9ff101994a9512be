use serde::{Deserialize, Serialize};

use crate::error::{LlmError, LlmResult};

/// Chat-completion providers with an OpenAI-compatible API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Groq,
    OpenRouter,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::OpenRouter => "openrouter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "openrouter" => Some(Self::OpenRouter),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Groq => "llama-3.1-8b-instant",
            Provider::OpenRouter => "meta-llama/llama-3.1-8b-instruct",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

/// Provider connection and generation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    /// Overrides the provider's default endpoint when set
    pub base_url: Option<String>,
    /// Overrides the provider's default model when set
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::for_provider(Provider::default())
    }
}

impl LlmConfig {
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            base_url: None,
            model: None,
            temperature: 0.2,
            max_tokens: 400,
            api_key_env: None,
            timeout_secs: 120,
        }
    }

    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn effective_api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Read the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> LlmResult<String> {
        let env_var = self.effective_api_key_env();
        match std::env::var(env_var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(LlmError::MissingApiKey {
                env_var: env_var.to_string(),
            }),
        }
    }

    pub fn validate(&self) -> LlmResult<()> {
        if self.effective_model().trim().is_empty() {
            return Err(LlmError::InvalidConfig("model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::InvalidConfig(format!(
                "temperature {} outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(LlmError::InvalidConfig("max_tokens must be positive".to_string()));
        }
        Ok(())
    }
}
