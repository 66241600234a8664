use super::{CompletionError, CompletionProvider, prompt::SYSTEM_INSTRUCTION};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Gemini through plain `generateContent` REST calls.
pub struct GeminiRest {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiRest {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
        generation: GenerationConfig,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        info!(
            "Gemini REST client initialized (model: {}, timeout: {}s)",
            model,
            timeout.as_secs()
        );
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            generation,
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.generation.temperature,
                "topP": self.generation.top_p,
                "topK": self.generation.top_k,
                "maxOutputTokens": self.generation.max_output_tokens,
                "responseMimeType": "text/plain",
            }
        })
    }
}

#[async_trait]
impl CompletionProvider for GeminiRest {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(match status.as_u16() {
                401 | 403 => CompletionError::Auth(message),
                code => CompletionError::Api {
                    status: code,
                    message,
                },
            });
        }

        let data: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;
        Ok(first_candidate_text(data))
    }
}

fn first_candidate_text(data: GenerateContentResponse) -> String {
    data.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}
