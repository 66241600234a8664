mod error;
mod gemini_rest;
mod prompt;
mod rig_gemini;

use crate::config::{Config, ProviderBinding};
use anyhow::Result;
use async_trait::async_trait;
pub use error::CompletionError;
pub use gemini_rest::GeminiRest;
pub use prompt::{SYSTEM_INSTRUCTION, build_prompt};
pub use rig_gemini::RigGemini;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Turns symptom text into model output. Holds no provider when no credential is configured.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl CompletionClient {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self { provider }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = &config.provider;
        let Some(api_key) = provider.api_key.as_deref() else {
            warn!(
                "Missing GEMINI_API_KEY/GOOGLE_API_KEY in environment. LLM calls will fail until configured."
            );
            return Ok(Self::new(None));
        };

        let provider: Arc<dyn CompletionProvider> = match provider.binding {
            ProviderBinding::Rig => Arc::new(RigGemini::new(
                api_key,
                &provider.model,
                Duration::from_secs(provider.timeout_secs),
                config.generation.clone(),
            )?),
            ProviderBinding::Rest => Arc::new(GeminiRest::new(
                api_key,
                &provider.model,
                &provider.base_url,
                Duration::from_secs(provider.timeout_secs),
                config.generation.clone(),
            )?),
        };
        info!("Completion provider ready ({})", provider.name());
        Ok(Self::new(Some(provider)))
    }

    /// The active binding, or `None` when unconfigured.
    pub fn provider_name(&self) -> Option<&'static str> {
        self.provider.as_ref().map(|p| p.name())
    }

    pub async fn generate(&self, symptom_text: &str) -> Result<String, CompletionError> {
        if symptom_text.trim().is_empty() {
            return Err(CompletionError::EmptyInput);
        }
        let Some(provider) = &self.provider else {
            return Err(CompletionError::NotConfigured);
        };

        let text = provider.complete(&build_prompt(symptom_text)).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
        reply: Result<String, CompletionError>,
    }

    #[async_trait]
    impl CompletionProvider for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn client_with(reply: Result<String, CompletionError>) -> (CompletionClient, Arc<Echo>) {
        let echo = Arc::new(Echo {
            calls: AtomicUsize::new(0),
            reply,
        });
        (CompletionClient::new(Some(echo.clone())), echo)
    }

    #[tokio::test]
    async fn blank_input_never_reaches_provider() {
        let (client, echo) = client_with(Ok("unused".into()));
        for text in ["", "   ", "\n\t "] {
            assert_eq!(
                client.generate(text).await,
                Err(CompletionError::EmptyInput)
            );
        }
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unconfigured_client_reports_missing_key() {
        let client = CompletionClient::new(None);
        assert_eq!(client.provider_name(), None);
        assert_eq!(
            client.generate("headache").await,
            Err(CompletionError::NotConfigured)
        );
    }

    #[tokio::test]
    async fn output_is_trimmed() {
        let (client, echo) = client_with(Ok("\n  - Rest and fluids  \n".into()));
        assert_eq!(
            client.generate("sore throat").await.unwrap(),
            "- Rest and fluids"
        );
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn whitespace_output_is_empty_response() {
        let (client, _) = client_with(Ok("   ".into()));
        assert_eq!(
            client.generate("sore throat").await,
            Err(CompletionError::EmptyResponse)
        );
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let (client, _) = client_with(Err(CompletionError::Transport("connection reset".into())));
        assert_eq!(
            client.generate("fever").await,
            Err(CompletionError::Transport("connection reset".into()))
        );
    }

    #[test]
    fn unconfigured_config_builds_empty_client() {
        let config = Config::from_sources(None, |_| None).unwrap();
        let client = CompletionClient::from_config(&config).unwrap();
        assert!(client.provider_name().is_none());
    }
}
