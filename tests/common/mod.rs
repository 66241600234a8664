#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use symptom_checker::api::{self, AppState};
use symptom_checker::config::{Config, CorsOrigins, DashboardConfig};
use symptom_checker::llm::{CompletionClient, CompletionError, CompletionProvider};
use symptom_checker::store::LogStore;
use tempfile::TempDir;

/// Provider double that replies with a fixed outcome and counts calls.
pub struct Scripted {
    pub calls: AtomicUsize,
    reply: Result<String, CompletionError>,
}

impl Scripted {
    pub fn replying(text: &str) -> Arc<Self> {
        Self::with(Ok(text.to_string()))
    }

    pub fn with(reply: Result<String, CompletionError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

pub struct TestApi {
    pub url: String,
    pub store: Arc<LogStore>,
    _dir: TempDir,
}

pub async fn serve_router(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn spawn_api(
    provider: Option<Arc<dyn CompletionProvider>>,
    cors: CorsOrigins,
) -> TestApi {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::new(&dir.path().join("history.db")).await.unwrap();
    let state = AppState::new(CompletionClient::new(provider), store.clone());
    let addr = serve_router(api::router(state, &cors)).await;

    TestApi {
        url: format!("http://{}", addr),
        store,
        _dir: dir,
    }
}

/// An address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn dashboard_config(base_api_url: &str, offline_path: &std::path::Path) -> DashboardConfig {
    let mut config = Config::from_sources(None, |_| None).unwrap().dashboard;
    config.base_api_url = base_api_url.to_string();
    config.diagnose_url = format!("{}/api/diagnose", base_api_url);
    config.logs_url = format!("{}/api/logs", base_api_url);
    config.feedback_url = format!("{}/api/feedback", base_api_url);
    config.offline_feedback_path = offline_path.to_path_buf();
    config
}

/// Stand-in for the Gemini `generateContent` endpoint with a canned reply.
#[derive(Clone)]
pub struct FakeGemini {
    pub url: String,
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Vec<(HashMap<String, String>, Value)>>>,
}

impl FakeGemini {
    /// Query parameters and JSON body of every request received so far.
    pub fn requests(&self) -> Vec<(HashMap<String, String>, Value)> {
        self.seen.lock().unwrap().clone()
    }
}

async fn generate_content(
    State(fake): State<FakeGemini>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> impl IntoResponse {
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    fake.seen.lock().unwrap().push((query, body));
    (
        fake.status,
        [("content-type", "application/json")],
        fake.body.clone(),
    )
}

/// Serves `status`/`body` at `path`; `url` is the server root.
pub async fn spawn_fake_gemini(path: &str, status: StatusCode, body: &str) -> FakeGemini {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let fake = FakeGemini {
        url: format!("http://{}", addr),
        status,
        body: body.to_string(),
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route(path, post(generate_content))
        .with_state(fake.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    fake
}
