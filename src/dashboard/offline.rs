use super::client::ApiClient;
use crate::types::FeedbackRecord;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// Where a feedback submission ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Submitted,
    SavedOffline,
    Lost,
}

/// Append-only JSON Lines file holding feedback the backend never received.
pub struct OfflineFeedback {
    path: PathBuf,
}

impl OfflineFeedback {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &FeedbackRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Number of saved records; zero when the file is missing or unreadable.
    pub async fn count(&self) -> usize {
        match fs::read_to_string(&self.path).await {
            Ok(content) => content.lines().filter(|l| !l.trim().is_empty()).count(),
            Err(_) => 0,
        }
    }
}

/// Posts feedback to the API, falling back to the offline file on any failure.
pub async fn submit_feedback(
    client: &ApiClient,
    offline: &OfflineFeedback,
    record: &FeedbackRecord,
) -> FeedbackOutcome {
    match client.submit_feedback(record).await {
        Ok(()) => {
            info!("Feedback submitted to backend");
            return FeedbackOutcome::Submitted;
        }
        Err(e) => warn!("Feedback endpoint unavailable, saving locally: {}", e),
    }

    match offline.append(record).await {
        Ok(()) => FeedbackOutcome::SavedOffline,
        Err(e) => {
            error!(
                "Failed to save feedback to {}: {}",
                offline.path().display(),
                e
            );
            FeedbackOutcome::Lost
        }
    }
}
