use super::DashboardState;
use super::client::ClientError;
use super::compose::{self, QUICK_TIPS};
use super::offline::{self, FeedbackOutcome};
use super::session::{
    Preferences, SessionEntry, expired_session_cookie, session_cookie, session_id_from,
};
use crate::types::{DiagnoseRequest, DiagnoseResponse, FeedbackRecord, LogEntry};
use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Session entries shown under the form.
const SHOWN_HISTORY: usize = 5;
const SHOWN_LOGS: usize = 10;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!("Failed to render page: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
struct Notice {
    level: &'static str,
    text: String,
}

impl Notice {
    fn new(level: &'static str, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct FormView {
    symptoms: String,
    age: u32,
    chronic: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResultView {
    text: String,
    disclaimer: String,
    confidence: Option<String>,
    actions: Vec<String>,
}

impl From<DiagnoseResponse> for ResultView {
    fn from(r: DiagnoseResponse) -> Self {
        Self {
            text: if r.result.is_empty() {
                "No result returned.".to_string()
            } else {
                r.result
            },
            disclaimer: r.disclaimer,
            confidence: r.confidence,
            actions: r.actions,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct LogsView {
    entries: Vec<LogEntry>,
    error: Option<String>,
}

/// Per-request parts of the page; the rest comes from session and config.
#[derive(Default)]
struct PageParts {
    form: FormView,
    result: Option<ResultView>,
    notice: Option<Notice>,
    feedback_notice: Option<Notice>,
    fetch_logs: bool,
}

#[derive(Serialize)]
struct PageView {
    backend: String,
    examples: Vec<compose::ExampleView>,
    tips: &'static [&'static str],
    preferences: Preferences,
    offline_count: usize,
    form: FormView,
    result: Option<ResultView>,
    notice: Option<Notice>,
    feedback_notice: Option<Notice>,
    history: Vec<SessionEntry>,
    logs: Option<LogsView>,
}

async fn open_session(state: &DashboardState, headers: &HeaderMap) -> String {
    let cookie = session_id_from(headers);
    state.sessions.write().await.touch(cookie.as_deref())
}

async fn render(
    state: &DashboardState,
    session_id: &str,
    parts: PageParts,
) -> Result<Response, PageError> {
    let (preferences, history) = {
        let sessions = state.sessions.read().await;
        match sessions.get(session_id) {
            Some(s) => (s.preferences.clone(), s.recent(SHOWN_HISTORY)),
            None => (Preferences::default(), Vec::new()),
        }
    };

    let logs = if parts.fetch_logs || preferences.auto_fetch_logs {
        Some(fetch_logs(state).await)
    } else {
        None
    };

    let view = PageView {
        backend: state.config.base_api_url.clone(),
        examples: compose::example_views(),
        tips: QUICK_TIPS,
        offline_count: state.offline.count().await,
        preferences,
        form: parts.form,
        result: parts.result,
        notice: parts.notice,
        feedback_notice: parts.feedback_notice,
        history,
        logs,
    };

    let html = state.templates.render("index.html", view)?;
    Ok((
        [(header::SET_COOKIE, session_cookie(session_id))],
        Html(html),
    )
        .into_response())
}

async fn fetch_logs(state: &DashboardState) -> LogsView {
    match state.client.logs().await {
        Ok(mut entries) => {
            entries.truncate(SHOWN_LOGS);
            LogsView {
                entries,
                error: None,
            }
        }
        Err(ClientError::Status { status, body }) => LogsView {
            entries: Vec::new(),
            error: Some(format!("Logs API error {}: {}", status, body)),
        },
        Err(e) => LogsView {
            entries: Vec::new(),
            error: Some(format!("Error fetching logs: {}", e)),
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    example: Option<String>,
}

pub async fn index(
    State(state): State<DashboardState>,
    headers: HeaderMap,
    Query(query): Query<IndexQuery>,
) -> Result<Response, PageError> {
    let session_id = open_session(&state, &headers).await;
    let symptoms = query
        .example
        .as_deref()
        .and_then(compose::example_text)
        .unwrap_or_default()
        .to_string();

    let parts = PageParts {
        form: FormView {
            symptoms,
            ..FormView::default()
        },
        ..PageParts::default()
    };
    render(&state, &session_id, parts).await
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    symptoms: String,
    #[serde(default)]
    age: String,
    #[serde(default)]
    chronic: String,
}

pub async fn analyze(
    State(state): State<DashboardState>,
    headers: HeaderMap,
    Form(form): Form<AnalyzeForm>,
) -> Result<Response, PageError> {
    let session_id = open_session(&state, &headers).await;
    let age = compose::parse_age(&form.age);
    let mut parts = PageParts {
        form: FormView {
            symptoms: form.symptoms.clone(),
            age,
            chronic: form.chronic.clone(),
        },
        ..PageParts::default()
    };

    if form.symptoms.trim().is_empty() {
        parts.notice = Some(Notice::new(
            "error",
            "Please enter your symptoms before analyzing.",
        ));
        return render(&state, &session_id, parts).await;
    }

    let user_id = {
        let sessions = state.sessions.read().await;
        sessions
            .get(&session_id)
            .map(|s| s.preferences.user_id.clone())
            .unwrap_or_else(|| Preferences::default().user_id)
    };
    let request = DiagnoseRequest {
        text: compose::compose_query(&form.symptoms, age, &form.chronic),
        user_id: Some(user_id).filter(|u| !u.trim().is_empty()),
    };

    match state.client.diagnose(&request).await {
        Ok(response) => {
            if let Some(session) = state.sessions.write().await.get_mut(&session_id) {
                session.record(SessionEntry {
                    time: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
                    symptom: form.symptoms.clone(),
                    result: response.result.clone(),
                });
            }
            parts.result = Some(ResultView::from(response));
        }
        Err(ClientError::Status { status, body }) => {
            warn!("Backend rejected diagnose request with {}", status);
            parts.notice = Some(Notice::new(
                "error",
                format!("Backend error {}: {}", status, body),
            ));
        }
        Err(e) => {
            warn!("Backend unreachable: {}", e);
            parts.notice = Some(Notice::new(
                "error",
                format!("Error connecting to backend: {}", e),
            ));
        }
    }

    render(&state, &session_id, parts).await
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    rating: String,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    result: String,
}

/// Out-of-range or missing ratings fall back to 5, the form's default.
fn parse_rating(raw: &str) -> i64 {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|r| (1..=5).contains(r))
        .unwrap_or(5)
}

pub async fn feedback(
    State(state): State<DashboardState>,
    headers: HeaderMap,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, PageError> {
    let session_id = open_session(&state, &headers).await;

    let record = FeedbackRecord {
        time: Some(Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
        rating: Some(parse_rating(&form.rating)),
        feedback: Some(form.feedback),
        result: Some(form.result),
    };

    let notice = match offline::submit_feedback(&state.client, &state.offline, &record).await {
        FeedbackOutcome::Submitted => Notice::new("success", "Thanks, feedback submitted."),
        FeedbackOutcome::SavedOffline => {
            Notice::new("warning", "Saved feedback locally (backend unreachable).")
        }
        FeedbackOutcome::Lost => Notice::new(
            "error",
            "Could not submit feedback and could not save it locally.",
        ),
    };

    let parts = PageParts {
        feedback_notice: Some(notice),
        ..PageParts::default()
    };
    render(&state, &session_id, parts).await
}

pub async fn logs(
    State(state): State<DashboardState>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let session_id = open_session(&state, &headers).await;
    let parts = PageParts {
        fetch_logs: true,
        ..PageParts::default()
    };
    render(&state, &session_id, parts).await
}

#[derive(Debug, Deserialize)]
pub struct OptionsForm {
    #[serde(default)]
    user_id: String,
    show_confidence: Option<String>,
    auto_fetch_logs: Option<String>,
}

pub async fn options(
    State(state): State<DashboardState>,
    headers: HeaderMap,
    Form(form): Form<OptionsForm>,
) -> Response {
    let session_id = open_session(&state, &headers).await;
    if let Some(session) = state.sessions.write().await.get_mut(&session_id) {
        session.preferences = Preferences {
            user_id: form.user_id.trim().to_string(),
            show_confidence: form.show_confidence.is_some(),
            auto_fetch_logs: form.auto_fetch_logs.is_some(),
        };
    }
    (
        [(header::SET_COOKIE, session_cookie(&session_id))],
        Redirect::to("/"),
    )
        .into_response()
}

/// The session's latest result as a text attachment.
pub async fn download(State(state): State<DashboardState>, headers: HeaderMap) -> Response {
    let session_id = open_session(&state, &headers).await;
    let latest = state
        .sessions
        .read()
        .await
        .get(&session_id)
        .and_then(|s| s.latest().map(|e| e.result.clone()));

    match latest {
        Some(text) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"symptom_result.txt\"",
                ),
            ],
            text,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "No result to download yet.").into_response(),
    }
}

pub async fn end_session(State(state): State<DashboardState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id_from(&headers) {
        state.sessions.write().await.end(&id);
    }
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}
