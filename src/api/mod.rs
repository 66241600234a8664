//! The JSON API: diagnose, history and feedback endpoints.

mod cors;
mod error;
pub mod handlers;

use crate::config::{Config, CorsOrigins};
use crate::llm::{CompletionClient, CompletionError};
use crate::store::LogStore;
use axum::{
    Router,
    routing::{get, post},
};
pub use cors::cors_layer;
pub use error::ApiError;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub completion: CompletionClient,
    pub store: Arc<LogStore>,
}

impl AppState {
    pub fn new(completion: CompletionClient, store: Arc<LogStore>) -> Self {
        Self { completion, store }
    }
}

/// Renders a completion outcome as the text shown to users and stored in history.
pub fn render_completion(outcome: Result<String, CompletionError>) -> String {
    match outcome {
        Ok(text) => text,
        Err(e) if e.is_notice() => e.to_string(),
        Err(e) => format!("An error occurred while processing your request: {}", e),
    }
}

pub fn router(state: AppState, cors: &CorsOrigins) -> Router {
    Router::new()
        .route("/api/diagnose", post(handlers::diagnose))
        .route("/api/logs", get(handlers::logs))
        .route("/api/feedback", post(handlers::feedback))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
}

pub async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let app = router(state, &config.cors);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Symptom checker API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_render_verbatim() {
        assert_eq!(
            render_completion(Err(CompletionError::NotConfigured)),
            "LLM is not configured (missing GEMINI_API_KEY)."
        );
        assert_eq!(
            render_completion(Err(CompletionError::EmptyResponse)),
            "No response generated."
        );
    }

    #[test]
    fn provider_failures_render_with_prefix() {
        let text = render_completion(Err(CompletionError::Transport(
            "connection refused".into(),
        )));
        assert_eq!(
            text,
            "An error occurred while processing your request: network error: connection refused"
        );

        let text = render_completion(Err(CompletionError::Api {
            status: 429,
            message: "quota".into(),
        }));
        assert!(text.ends_with("provider returned HTTP 429: quota"));
    }

    #[test]
    fn success_renders_as_is() {
        assert_eq!(render_completion(Ok("- Rest".into())), "- Rest");
    }
}
