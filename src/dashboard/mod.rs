//! Server-rendered web front end that talks to the API service over HTTP.

pub mod client;
pub mod compose;
pub mod offline;
mod pages;
pub mod session;
mod templates;

use crate::config::DashboardConfig;
use axum::{
    Router,
    routing::{get, post},
};
pub use client::{ApiClient, ClientError};
pub use offline::{FeedbackOutcome, OfflineFeedback, submit_feedback};
pub use session::SessionManager;
use std::sync::Arc;
pub use templates::TemplateEngine;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct DashboardState {
    pub config: Arc<DashboardConfig>,
    pub client: ApiClient,
    pub offline: Arc<OfflineFeedback>,
    pub sessions: Arc<RwLock<SessionManager>>,
    pub templates: Arc<TemplateEngine>,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> anyhow::Result<Self> {
        let templates = TemplateEngine::new()?;
        Ok(Self {
            client: ApiClient::new(&config),
            offline: Arc::new(OfflineFeedback::new(config.offline_feedback_path.clone())),
            sessions: Arc::new(RwLock::new(SessionManager::new())),
            templates: Arc::new(templates),
            config: Arc::new(config),
        })
    }
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/analyze", post(pages::analyze))
        .route("/feedback", post(pages::feedback))
        .route("/logs", get(pages::logs))
        .route("/options", post(pages::options))
        .route("/download", get(pages::download))
        .route("/session/end", post(pages::end_session))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: DashboardState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    info!("Backend: {}", state.config.base_api_url);
    info!(
        "Offline feedback file: {}",
        state.offline.path().display()
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::api::shutdown_signal())
        .await?;
    Ok(())
}
