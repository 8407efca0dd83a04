use crate::domain::chart::ChartConfig;
use crate::domain::error::{AppError, FailureKind};
use crate::domain::language::Language;
use crate::domain::value::Row;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Outcome of one natural-language query run through the pipeline.
///
/// Built only through [`GenerationResult::success`] and
/// [`GenerationResult::failure`], which keep the two shapes apart: a
/// success always carries SQL and rows, a failure always carries an error
/// message and nothing else downstream of execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub sql: Option<String>,
    pub data: Vec<Row>,
    pub insights: String,
    pub chart_config: Option<ChartConfig>,
    pub execution_time_ms: f64,
    pub is_successful: bool,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub language: Language,
}

impl GenerationResult {
    pub fn success(
        sql: String,
        data: Vec<Row>,
        insights: String,
        chart_config: ChartConfig,
        execution_time_ms: f64,
        language: Language,
    ) -> Self {
        Self {
            sql: Some(sql),
            data,
            insights,
            chart_config: Some(chart_config),
            execution_time_ms,
            is_successful: true,
            error_message: None,
            failure_kind: None,
            language,
        }
    }

    pub fn failure(sql: Option<String>, error: &AppError, language: Language) -> Self {
        let mut message = error.to_string();
        if message.trim().is_empty() {
            message = "Unknown error".to_string();
        }
        Self {
            sql: sql.filter(|s| !s.trim().is_empty()),
            data: Vec::new(),
            insights: String::new(),
            chart_config: None,
            execution_time_ms: 0.0,
            is_successful: false,
            error_message: Some(message),
            failure_kind: Some(error.failure_kind()),
            language,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 4096))]
    pub natural_language_query: String,
    pub connection_id: i64,
}

/// Immutable log entry of one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: i64,
    pub user_id: i64,
    /// Loose reference; the record outlives the connection.
    pub connection_id: Option<i64>,
    pub natural_language_query: String,
    pub generated_sql: Option<String>,
    pub execution_result: Vec<Row>,
    pub ai_insights: String,
    pub chart_config: Option<ChartConfig>,
    pub execution_time_ms: f64,
    pub is_successful: bool,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQueryRecord {
    pub user_id: i64,
    pub connection_id: Option<i64>,
    pub natural_language_query: String,
    pub result: GenerationResult,
}

impl NewQueryRecord {
    pub fn new(
        user_id: i64,
        connection_id: Option<i64>,
        natural_language_query: &str,
        result: GenerationResult,
    ) -> Self {
        Self {
            user_id,
            connection_id,
            natural_language_query: natural_language_query.to_string(),
            result,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryStats {
    pub total_queries: i64,
    pub successful_queries: i64,
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub data_sources_connected: i64,
}

impl QueryStats {
    pub fn from_counts(
        total_queries: i64,
        successful_queries: i64,
        avg_response_time: Option<f64>,
        data_sources_connected: i64,
    ) -> Self {
        let success_rate = if total_queries > 0 {
            successful_queries as f64 / total_queries as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_queries,
            successful_queries,
            success_rate: round1(success_rate),
            avg_response_time: round1(avg_response_time.unwrap_or(0.0)),
            data_sources_connected,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
