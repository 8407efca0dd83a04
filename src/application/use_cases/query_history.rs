use crate::domain::error::Result;
use crate::domain::query_record::{GenerationResult, NewQueryRecord, QueryRecord, QueryStats};
use crate::infrastructure::db::sqlite::SqliteRepository;
use std::sync::Arc;
use tracing::{debug, error};

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Append-only log of query attempts.
pub struct QueryHistoryService {
    repo: Arc<SqliteRepository>,
}

impl QueryHistoryService {
    pub fn new(repo: Arc<SqliteRepository>) -> Self {
        Self { repo }
    }

    /// Persists one attempt, successful or not.
    pub async fn record(
        &self,
        user_id: i64,
        connection_id: Option<i64>,
        natural_language_query: &str,
        result: GenerationResult,
    ) -> Result<QueryRecord> {
        let new_record = NewQueryRecord::new(user_id, connection_id, natural_language_query, result);
        match self.repo.insert_query_record(&new_record).await {
            Ok(record) => {
                debug!(
                    user_id,
                    record_id = record.id,
                    success = record.is_successful,
                    "Query recorded"
                );
                Ok(record)
            }
            Err(e) => {
                error!(user_id, "Failed to record query: {}", e);
                Err(e)
            }
        }
    }

    /// Newest first. `limit` defaults to 50 and is clamped to 1..=100.
    pub async fn list(&self, user_id: i64, limit: Option<i64>) -> Result<Vec<QueryRecord>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.repo.list_query_records(user_id, limit).await
    }

    pub async fn stats(&self, user_id: i64) -> Result<QueryStats> {
        let (total, successful, avg_time) = self.repo.query_counts(user_id).await?;
        let connections = self.repo.count_active_connections(user_id).await?;
        Ok(QueryStats::from_counts(total, successful, avg_time, connections))
    }
}
