use thiserror::Error;

/// Errors raised while talking to a chat-completion provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Provider API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Provider rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("Provider returned no completion")]
    EmptyResponse,

    #[error("API key missing: set the {env_var} environment variable")]
    MissingApiKey { env_var: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl LlmError {
    /// Whether the request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::Api {
                status_code: Some(code),
                ..
            } => *code >= 500,
            _ => false,
        }
    }
}

/// Result type alias for provider calls
pub type LlmResult<T> = Result<T, LlmError>;
