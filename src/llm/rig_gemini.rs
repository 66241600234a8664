use super::{CompletionError, CompletionProvider, prompt::SYSTEM_INSTRUCTION};
use crate::config::GenerationConfig;
use anyhow::Result;
use async_trait::async_trait;
use rig::{
    client::CompletionClient,
    completion::{CompletionError as RigCompletionError, Prompt, PromptError},
    providers::gemini,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Host rig appends `/v1beta/models/...` to.
pub const RIG_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const REDACTED: &str = "[redacted]";

/// Gemini through the rig-core provider client.
pub struct RigGemini {
    client: gemini::Client,
    api_key: String,
    model: String,
    generation: GenerationConfig,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl RigGemini {
    pub fn new(
        api_key: &str,
        model: &str,
        timeout: Duration,
        generation: GenerationConfig,
    ) -> Result<Self> {
        Self::with_base_url(api_key, model, RIG_GEMINI_BASE_URL, timeout, generation)
    }

    pub fn with_base_url(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
        generation: GenerationConfig,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let client: gemini::Client = gemini::Client::builder()
            .api_key(api_key)
            .base_url(base_url.trim_end_matches('/'))
            .http_client(http)
            .build()?;
        info!(
            "rig Gemini client initialized (model: {}, timeout: {}s)",
            model,
            timeout.as_secs()
        );
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            generation,
        })
    }

    fn generation_params(&self) -> serde_json::Value {
        serde_json::json!({
            "generationConfig": {
                "topP": self.generation.top_p,
                "topK": self.generation.top_k,
                "responseMimeType": "text/plain",
            }
        })
    }

    /// rig puts the key in the request URL, and transport errors echo that URL.
    fn redact(&self, message: impl ToString) -> String {
        let message = message.to_string();
        if self.api_key.is_empty() {
            message
        } else {
            message.replace(&self.api_key, REDACTED)
        }
    }

    fn classify(&self, err: PromptError) -> CompletionError {
        match err {
            PromptError::CompletionError(RigCompletionError::HttpError(e)) => {
                CompletionError::Transport(self.redact(e))
            }
            PromptError::CompletionError(RigCompletionError::JsonError(e)) => {
                CompletionError::MalformedResponse(self.redact(e))
            }
            PromptError::CompletionError(RigCompletionError::ResponseError(msg)) => {
                CompletionError::MalformedResponse(self.redact(msg))
            }
            PromptError::CompletionError(RigCompletionError::ProviderError(body)) => {
                provider_error(&self.redact(body))
            }
            other => CompletionError::Provider(self.redact(other)),
        }
    }
}

#[async_trait]
impl CompletionProvider for RigGemini {
    fn name(&self) -> &'static str {
        "rig"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(SYSTEM_INSTRUCTION)
            .temperature(self.generation.temperature)
            .max_tokens(self.generation.max_output_tokens)
            .additional_params(self.generation_params())
            .build();

        debug!("Sending prompt to {} via rig", self.model);
        let response = agent
            .prompt(prompt)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(response.to_string())
    }
}

/// rig hands back the raw body of a non-success reply.
fn provider_error(body: &str) -> CompletionError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            if matches!(error.code, 401 | 403)
                || looks_like_auth_failure(&error.status)
                || looks_like_auth_failure(&error.message)
            {
                CompletionError::Auth(error.message)
            } else if error.code != 0 {
                CompletionError::Api {
                    status: error.code,
                    message: error.message,
                }
            } else {
                CompletionError::Provider(error.message)
            }
        }
        Err(_) if looks_like_auth_failure(body) => CompletionError::Auth(body.to_string()),
        Err(_) => CompletionError::Provider(body.to_string()),
    }
}

fn looks_like_auth_failure(message: &str) -> bool {
    ["API_KEY_INVALID", "API key not valid", "PERMISSION_DENIED", "UNAUTHENTICATED"]
        .iter()
        .any(|marker| message.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_messages_about_keys_are_auth_failures() {
        assert!(looks_like_auth_failure(
            "API key not valid. Please pass a valid API key."
        ));
        assert!(!looks_like_auth_failure("RESOURCE_EXHAUSTED: quota exceeded"));
    }

    #[test]
    fn error_envelope_status_picks_kind() {
        assert_eq!(
            provider_error(
                r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#
            ),
            CompletionError::Auth("API key not valid.".into())
        );
        assert_eq!(
            provider_error(
                r#"{"error": {"code": 403, "message": "denied", "status": "PERMISSION_DENIED"}}"#
            ),
            CompletionError::Auth("denied".into())
        );
        assert_eq!(
            provider_error(
                r#"{"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}"#
            ),
            CompletionError::Api {
                status: 429,
                message: "quota".into()
            }
        );
        assert_eq!(
            provider_error("Bad Gateway"),
            CompletionError::Provider("Bad Gateway".into())
        );
    }

    #[test]
    fn key_is_scrubbed_from_messages() {
        let rig = RigGemini::new(
            "SECRET-KEY-123",
            "gemini-test",
            Duration::from_secs(1),
            GenerationConfig::default(),
        )
        .unwrap();
        assert_eq!(
            rig.redact("error sending request for url (http://h/v1beta/models/m:generateContent?key=SECRET-KEY-123)"),
            "error sending request for url (http://h/v1beta/models/m:generateContent?key=[redacted])"
        );
    }
}
