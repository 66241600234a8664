use crate::entity::history;
use chrono::Utc;
use sea_orm::*;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Layout of `created_at`, matching SQLite's `CURRENT_TIMESTAMP`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One persisted diagnose interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: i64,
    pub user_id: Option<String>,
    pub symptoms: String,
    pub response: String,
    pub created_at: String,
}

impl From<history::Model> for HistoryRecord {
    fn from(r: history::Model) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            symptoms: r.symptoms,
            response: r.response,
            created_at: r.created_at,
        }
    }
}

/// Append-only log of diagnose calls in a single SQLite table.
pub struct LogStore {
    db_url: String,
}

impl LogStore {
    pub async fn new(db_path: &Path) -> Result<Arc<Self>, StoreError> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        tokio::task::spawn_blocking({
            let db_url = db_url.clone();
            move || -> Result<(), StoreError> {
                let db = Database::connect(&db_url)?;
                db.get_schema_builder()
                    .register(history::Entity)
                    .sync(&db)?;
                Ok(())
            }
        })
        .await??;

        info!("History log ready ({})", db_path.display());
        Ok(Arc::new(Self { db_url }))
    }

    pub async fn save(
        &self,
        user_id: Option<&str>,
        symptoms: &str,
        response: &str,
    ) -> Result<HistoryRecord, StoreError> {
        let created_at = Utc::now().format(TIMESTAMP_FORMAT).to_string();

        let record = history::ActiveModel {
            id: NotSet,
            user_id: Set(user_id.map(str::to_string)),
            symptoms: Set(symptoms.to_string()),
            response: Set(response.to_string()),
            created_at: Set(created_at.clone()),
        };

        let db_url = self.db_url.clone();
        let id = tokio::task::spawn_blocking(move || -> Result<i64, StoreError> {
            let db = Database::connect(&db_url)?;
            let result = history::Entity::insert(record).exec(&db)?;
            Ok(result.last_insert_id)
        })
        .await??;

        debug!("Saved history record {}", id);
        Ok(HistoryRecord {
            id,
            user_id: user_id.map(str::to_string),
            symptoms: symptoms.to_string(),
            response: response.to_string(),
            created_at,
        })
    }

    /// Up to `limit` records, newest id first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<HistoryRecord>, StoreError> {
        let db_url = self.db_url.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<HistoryRecord>, StoreError> {
            let db = Database::connect(&db_url)?;
            let rows = history::Entity::find()
                .order_by_desc(history::Column::Id)
                .limit(limit)
                .all(&db)?;
            Ok(rows.into_iter().map(HistoryRecord::from).collect())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_in(dir: &tempfile::TempDir) -> Arc<LogStore> {
        LogStore::new(&dir.path().join("history.db")).await.unwrap()
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        for i in 0..12 {
            store
                .save(Some("anonymous"), &format!("symptom {}", i), "response")
                .await
                .unwrap();
        }

        let records = store.recent(10).await.unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].symptoms, "symptom 11");
        assert!(records.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn save_returns_what_recent_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let saved = store
            .save(None, "dry cough", "1. Common cold\n2. Allergies")
            .await
            .unwrap();
        let records = store.recent(1).await.unwrap();

        assert_eq!(records, vec![saved]);
        assert_eq!(records[0].user_id, None);
    }

    #[tokio::test]
    async fn ids_keep_increasing_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first = store_in(&dir).await.save(None, "a", "b").await.unwrap();
        let second = store_in(&dir).await.save(None, "c", "d").await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn reopening_keeps_existing_history() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir)
            .await
            .save(Some("u-1"), "sore throat", "1. Common cold")
            .await
            .unwrap();

        let reopened = store_in(&dir).await;
        let records = reopened.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symptoms, "sore throat");
        assert_eq!(records[0].user_id.as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("history.db");
        let store = LogStore::new(&path).await.unwrap();
        assert!(store.recent(10).await.unwrap().is_empty());
        assert!(path.exists());
    }
}
