use super::{ApiError, AppState, render_completion};
use crate::types::{Ack, DiagnoseRequest, DiagnoseResponse, FeedbackRecord, LogEntry, LogsResponse};
use axum::{Json, extract::State, http::StatusCode};
use tracing::{info, warn};

/// Number of records served by the history endpoint.
pub const HISTORY_LIMIT: u64 = 10;

pub async fn diagnose(
    State(state): State<AppState>,
    Json(req): Json<DiagnoseRequest>,
) -> Result<Json<DiagnoseResponse>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::EmptySymptoms);
    }

    let outcome = state.completion.generate(&req.text).await;
    if let Err(ref e) = outcome {
        warn!("Completion did not produce a result: {}", e);
    }
    let result = render_completion(outcome);

    let record = state
        .store
        .save(req.user_id.as_deref(), &req.text, &result)
        .await?;
    info!(
        "Diagnose request recorded as #{} (user: {})",
        record.id,
        req.user_id.as_deref().unwrap_or("-")
    );

    Ok(Json(DiagnoseResponse::new(result)))
}

pub async fn logs(State(state): State<AppState>) -> Result<Json<LogsResponse>, ApiError> {
    let records = state.store.recent(HISTORY_LIMIT).await?;
    Ok(Json(LogsResponse {
        logs: records.into_iter().map(LogEntry::from).collect(),
    }))
}

/// Acknowledges feedback without storing it.
pub async fn feedback(Json(fb): Json<FeedbackRecord>) -> (StatusCode, Json<Ack>) {
    info!(
        "Feedback received (rating: {}, with comment: {})",
        fb.rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string()),
        fb.feedback.as_deref().is_some_and(|f| !f.trim().is_empty())
    );
    (StatusCode::CREATED, Json(Ack::ok()))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "llm": state.completion.provider_name().unwrap_or("unconfigured"),
    }))
}
