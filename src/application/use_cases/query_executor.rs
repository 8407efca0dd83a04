use crate::application::use_cases::sql_guard::check_sql;
use crate::domain::connection::DbConnection;
use crate::domain::error::AppError;
use crate::domain::value::Row;
use crate::infrastructure::db::connectors::ConnectorRegistry;
use std::time::Instant;
use tracing::{info, warn};

/// Result of running one statement. `error` is set exactly when `success` is false.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub rows: Vec<Row>,
    pub execution_time_ms: f64,
    pub success: bool,
    pub error: Option<AppError>,
}

impl ExecutionOutcome {
    fn succeeded(rows: Vec<Row>, execution_time_ms: f64) -> Self {
        Self {
            rows,
            execution_time_ms,
            success: true,
            error: None,
        }
    }

    fn failed(error: AppError, execution_time_ms: f64) -> Self {
        Self {
            rows: Vec::new(),
            execution_time_ms,
            success: false,
            error: Some(error),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

pub struct QueryExecutor {
    connectors: ConnectorRegistry,
}

impl QueryExecutor {
    pub fn new(connectors: ConnectorRegistry) -> Self {
        Self { connectors }
    }

    /// Denylist check, then execution through the connection's engine connector.
    pub async fn execute(&self, conn: &DbConnection, sql: &str) -> ExecutionOutcome {
        let started = Instant::now();

        if let Err(e) = check_sql(sql) {
            warn!(connection_id = conn.id, "Rejected statement: {}", e);
            return ExecutionOutcome::failed(e, elapsed_ms(started));
        }

        let connector = match self.connectors.get(conn.engine) {
            Ok(connector) => connector,
            Err(e) => return ExecutionOutcome::failed(e, elapsed_ms(started)),
        };

        match connector.execute(conn, sql).await {
            Ok(rows) => {
                let elapsed = elapsed_ms(started);
                info!(
                    connection_id = conn.id,
                    engine = conn.engine.as_str(),
                    rows = rows.len(),
                    elapsed_ms = elapsed,
                    "Query executed"
                );
                ExecutionOutcome::succeeded(rows, elapsed)
            }
            Err(e) => {
                warn!(
                    connection_id = conn.id,
                    engine = conn.engine.as_str(),
                    "Query failed: {}",
                    e
                );
                ExecutionOutcome::failed(e, elapsed_ms(started))
            }
        }
    }
}
