//! Error types for OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The model answered without any content (refusal, filtered output)
    #[error("Empty response from model")]
    EmptyResponse,
}

impl OpenAIError {
    /// Whether the failure is likely transient (network, rate limit, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            OpenAIError::Network(_) => true,
            OpenAIError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(OpenAIError::Network("reset".into()).is_transient());
        assert!(OpenAIError::Api { status: 429, message: "slow down".into() }.is_transient());
        assert!(OpenAIError::Api { status: 503, message: "busy".into() }.is_transient());
        assert!(!OpenAIError::Api { status: 400, message: "bad".into() }.is_transient());
        assert!(!OpenAIError::EmptyResponse.is_transient());
    }
}
