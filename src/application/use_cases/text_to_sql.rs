//! Natural-language query pipeline.
//!
//! One call walks `received -> schema context -> sql generated -> executed`
//! and then builds insight and chart on success. The first failing step
//! ends the attempt; its error becomes the failure-shaped result. There are
//! no retries.

use crate::application::use_cases::chart_builder::build_chart;
use crate::application::use_cases::insight_generator::InsightGenerator;
use crate::application::use_cases::language_detector::detect_language;
use crate::application::use_cases::query_executor::QueryExecutor;
use crate::application::use_cases::schema_introspector::{
    render_schema_listing, restrict_to_selection, SchemaIntrospector,
};
use crate::application::use_cases::sql_generator::{GeneratedSql, SqlGenerator};
use crate::application::use_cases::table_ranker::build_schema_context;
use crate::domain::connection::DbConnection;
use crate::domain::error::AppError;
use crate::domain::language::Language;
use crate::domain::query_record::GenerationResult;
use crate::domain::schema::SelectedTable;
use crate::infrastructure::db::connectors::ConnectorRegistry;
use crate::infrastructure::llm_clients::pool::GenerationPool;
use tracing::{info, warn};

/// Where an attempt stopped, with the SQL produced so far.
struct StepFailure {
    sql: Option<String>,
    error: AppError,
}

impl StepFailure {
    fn before_sql(error: AppError) -> Self {
        Self { sql: None, error }
    }
}

pub struct TextToSqlService {
    introspector: SchemaIntrospector,
    sql_generator: SqlGenerator,
    executor: QueryExecutor,
    insights: InsightGenerator,
    prompt_token_budget: usize,
}

impl TextToSqlService {
    pub fn new(
        connectors: ConnectorRegistry,
        pool: GenerationPool,
        prompt_token_budget: usize,
    ) -> Self {
        Self {
            introspector: SchemaIntrospector::new(connectors.clone()),
            sql_generator: SqlGenerator::new(pool.clone()),
            executor: QueryExecutor::new(connectors),
            insights: InsightGenerator::new(pool),
            prompt_token_budget,
        }
    }

    /// Runs the whole pipeline. Never returns an error: every failure is
    /// folded into a failure-shaped [`GenerationResult`].
    pub async fn generate(
        &self,
        query: &str,
        conn: &DbConnection,
        selection: &[SelectedTable],
    ) -> GenerationResult {
        let language = detect_language(query);
        info!(
            connection_id = conn.id,
            language = language.code(),
            "Query received"
        );

        match self.run(query, conn, selection, language).await {
            Ok(result) => result,
            Err(failure) => {
                warn!(
                    connection_id = conn.id,
                    failure_kind = failure.error.failure_kind().as_str(),
                    "Query attempt failed: {}",
                    failure.error
                );
                GenerationResult::failure(failure.sql, &failure.error, language)
            }
        }
    }

    async fn run(
        &self,
        query: &str,
        conn: &DbConnection,
        selection: &[SelectedTable],
        language: Language,
    ) -> std::result::Result<GenerationResult, StepFailure> {
        let tables = self
            .introspector
            .introspect(conn)
            .await
            .map_err(StepFailure::before_sql)?;

        let tables = restrict_to_selection(tables, selection);
        if tables.is_empty() {
            return Err(StepFailure::before_sql(AppError::ConnectivityError(format!(
                "No usable schema for connection '{}'",
                conn.name
            ))));
        }

        let listing = render_schema_listing(conn, &tables);
        let context = build_schema_context(query, &listing, self.prompt_token_budget);
        info!(
            connection_id = conn.id,
            tables = tables.len(),
            ranked = context.tables.len(),
            filtered = context.filtered,
            dropped_for_budget = context.dropped_for_budget,
            "Schema context built"
        );

        let sql = match self
            .sql_generator
            .generate(query, language, conn.engine, &context)
            .await
        {
            GeneratedSql::Statement(sql) => sql,
            GeneratedSql::Diagnostic(error) => return Err(StepFailure::before_sql(error)),
        };

        let outcome = self.executor.execute(conn, &sql).await;
        if !outcome.success {
            let error = outcome
                .error
                .unwrap_or_else(|| AppError::Internal("Execution failed".to_string()));
            return Err(StepFailure {
                sql: Some(sql),
                error,
            });
        }

        let insights = self.insights.generate(query, &outcome.rows, language).await;
        let chart = build_chart(&outcome.rows, language);
        info!(
            connection_id = conn.id,
            rows = outcome.rows.len(),
            chart = chart.kind(),
            "Query answered"
        );

        Ok(GenerationResult::success(
            sql,
            outcome.rows,
            insights,
            chart,
            outcome.execution_time_ms,
            language,
        ))
    }
}
