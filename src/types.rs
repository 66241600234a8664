//! JSON bodies exchanged between the dashboard and the API service.

use crate::store::HistoryRecord;
use serde::{Deserialize, Serialize};

/// Returned with every diagnose result.
pub const DISCLAIMER: &str = "Educational purpose only.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnoseRequest {
    pub text: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnoseResponse {
    pub result: String,
    pub disclaimer: String,
    // Reserved: the service never fills these, the dashboard renders them when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
}

impl DiagnoseResponse {
    pub fn new(result: String) -> Self {
        Self {
            result,
            disclaimer: DISCLAIMER.to_string(),
            confidence: None,
            actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub symptom: String,
    pub response: String,
    pub created_at: String,
}

impl From<HistoryRecord> for LogEntry {
    fn from(r: HistoryRecord) -> Self {
        Self {
            id: r.id,
            symptom: r.symptoms,
            response: r.response,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

/// A rating of one result. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
