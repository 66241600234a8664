use thiserror::Error;

/// Why a completion produced no usable text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("Please provide a valid symptom description.")]
    EmptyInput,
    #[error("LLM is not configured (missing GEMINI_API_KEY).")]
    NotConfigured,
    #[error("No response generated.")]
    EmptyResponse,
    #[error("network error: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("{0}")]
    Provider(String),
}

impl CompletionError {
    /// True for outcomes that never reached the provider or got nothing back from it.
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::NotConfigured | Self::EmptyResponse
        )
    }
}
