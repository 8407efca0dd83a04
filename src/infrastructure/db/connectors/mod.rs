//! Target-database connectors.
//!
//! Each engine gets one [`DbConnector`]. Every call opens its own connection,
//! uses it exclusively and closes it before returning, on success and error
//! alike. Nothing is pooled across calls or users.

pub mod postgres;

use crate::domain::connection::{DbConnection, DbEngine};
use crate::domain::error::{AppError, Result};
use crate::domain::schema::TableSchema;
use crate::domain::value::Row;
use async_trait::async_trait;
use postgres::PostgresConnector;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Schemas never offered to the user or the prompt.
pub const SYSTEM_SCHEMAS: [&str; 3] = ["information_schema", "pg_catalog", "pg_toast"];

#[async_trait]
pub trait DbConnector: Send + Sync {
    /// Connects and runs a trivial health check.
    async fn test(&self, conn: &DbConnection) -> Result<()>;

    /// Lists user tables with their columns, ordered by schema then table.
    async fn introspect(&self, conn: &DbConnection) -> Result<Vec<TableSchema>>;

    /// Runs one statement and returns JSON-safe rows in select-list order.
    async fn execute(&self, conn: &DbConnection, sql: &str) -> Result<Vec<Row>>;
}

/// Placeholder for engines that are declared but not wired up.
pub struct UnsupportedConnector {
    engine: DbEngine,
}

impl UnsupportedConnector {
    pub fn new(engine: DbEngine) -> Self {
        Self { engine }
    }

    fn error(&self) -> AppError {
        AppError::Unsupported(format!(
            "{} connections are not supported yet",
            self.engine.dialect()
        ))
    }
}

#[async_trait]
impl DbConnector for UnsupportedConnector {
    async fn test(&self, _conn: &DbConnection) -> Result<()> {
        Err(self.error())
    }

    async fn introspect(&self, _conn: &DbConnection) -> Result<Vec<TableSchema>> {
        Err(self.error())
    }

    async fn execute(&self, _conn: &DbConnection, _sql: &str) -> Result<Vec<Row>> {
        Err(self.error())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectorTimeouts {
    pub connect: Duration,
    pub query: Duration,
}

impl Default for ConnectorTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            query: Duration::from_secs(30),
        }
    }
}

/// Engine kind to connector. Engines without an entry fail as unsupported.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<DbEngine, Arc<dyn DbConnector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// PostgreSQL is concrete; the remaining engines are registered as unsupported.
    pub fn with_defaults(timeouts: ConnectorTimeouts) -> Self {
        Self::new()
            .register(
                DbEngine::Postgresql,
                Arc::new(PostgresConnector::new(timeouts)),
            )
            .register(
                DbEngine::Mysql,
                Arc::new(UnsupportedConnector::new(DbEngine::Mysql)),
            )
            .register(
                DbEngine::Sqlite,
                Arc::new(UnsupportedConnector::new(DbEngine::Sqlite)),
            )
    }

    pub fn register(mut self, engine: DbEngine, connector: Arc<dyn DbConnector>) -> Self {
        self.connectors.insert(engine, connector);
        self
    }

    pub fn get(&self, engine: DbEngine) -> Result<Arc<dyn DbConnector>> {
        self.connectors.get(&engine).cloned().ok_or_else(|| {
            AppError::Unsupported(format!("No connector registered for {}", engine))
        })
    }
}
