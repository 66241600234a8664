use crate::config::DashboardConfig;
use crate::types::{DiagnoseRequest, DiagnoseResponse, FeedbackRecord, LogEntry, LogsResponse};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

const DIAGNOSE_TIMEOUT: Duration = Duration::from_secs(30);
const LOGS_TIMEOUT: Duration = Duration::from_secs(20);
const FEEDBACK_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status}: {body}")]
    Status { status: u16, body: String },
}

/// HTTP client for the API service.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    diagnose_url: String,
    logs_url: String,
    feedback_url: String,
}

impl ApiClient {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            diagnose_url: config.diagnose_url.clone(),
            logs_url: config.logs_url.clone(),
            feedback_url: config.feedback_url.clone(),
        }
    }

    pub async fn diagnose(&self, req: &DiagnoseRequest) -> Result<DiagnoseResponse, ClientError> {
        let resp = self
            .http
            .post(&self.diagnose_url)
            .json(req)
            .timeout(DIAGNOSE_TIMEOUT)
            .send()
            .await?;

        let resp = expect_status(resp, &[StatusCode::OK]).await?;
        Ok(resp.json().await?)
    }

    pub async fn logs(&self) -> Result<Vec<LogEntry>, ClientError> {
        let resp = self
            .http
            .get(&self.logs_url)
            .timeout(LOGS_TIMEOUT)
            .send()
            .await?;

        let resp = expect_status(resp, &[StatusCode::OK]).await?;
        let data: LogsResponse = resp.json().await?;
        Ok(data.logs)
    }

    /// Succeeds only on 200 or 201.
    pub async fn submit_feedback(&self, feedback: &FeedbackRecord) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(&self.feedback_url)
            .json(feedback)
            .timeout(FEEDBACK_TIMEOUT)
            .send()
            .await?;

        expect_status(resp, &[StatusCode::OK, StatusCode::CREATED]).await?;
        Ok(())
    }
}

async fn expect_status(
    resp: reqwest::Response,
    accepted: &[StatusCode],
) -> Result<reqwest::Response, ClientError> {
    if accepted.contains(&resp.status()) {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}
