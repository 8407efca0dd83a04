//! In-memory fakes for the provider and connector seams.

use crate::domain::connection::{DbConnection, DbConnectionInput, DbEngine};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::schema::{ColumnMeta, TableSchema};
use crate::domain::value::Row;
use crate::infrastructure::db::connectors::DbConnector;
use crate::infrastructure::llm_clients::pool::GenerationPool;
use crate::infrastructure::llm_clients::LLMClient;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub config: LLMConfig,
    pub system: String,
    pub user: String,
}

/// Replies with scripted responses in order; records every call.
#[derive(Default)]
pub struct FakeLlm {
    responses: Mutex<VecDeque<Result<String>>>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl FakeLlm {
    pub fn new(responses: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(responses: &[&str]) -> Arc<Self> {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call(&self, index: usize) -> RecordedCall {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LLMClient for FakeLlm {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            config: config.clone(),
            system: system.to_string(),
            user: user.to_string(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::LLMError("no scripted response".to_string())))
    }
}

pub fn pool(llm: Arc<FakeLlm>) -> GenerationPool {
    GenerationPool::new(llm, LLMConfig::default(), 2, Duration::from_secs(5))
}

/// Serves a fixed schema and fixed rows.
pub struct FakeConnector {
    pub tables: Result<Vec<TableSchema>>,
    pub rows: Result<Vec<Row>>,
    pub executed: AtomicUsize,
    pub tested: AtomicUsize,
    pub test_result: Result<()>,
}

impl FakeConnector {
    pub fn new(tables: Vec<TableSchema>, rows: Vec<Row>) -> Arc<Self> {
        Arc::new(Self {
            tables: Ok(tables),
            rows: Ok(rows),
            executed: AtomicUsize::new(0),
            tested: AtomicUsize::new(0),
            test_result: Ok(()),
        })
    }

    pub fn failing(error: AppError) -> Arc<Self> {
        Arc::new(Self {
            tables: Err(error.clone()),
            rows: Err(error.clone()),
            executed: AtomicUsize::new(0),
            tested: AtomicUsize::new(0),
            test_result: Err(error),
        })
    }

    pub fn with_rows_error(tables: Vec<TableSchema>, error: AppError) -> Arc<Self> {
        Arc::new(Self {
            tables: Ok(tables),
            rows: Err(error),
            executed: AtomicUsize::new(0),
            tested: AtomicUsize::new(0),
            test_result: Ok(()),
        })
    }

    pub fn execute_count(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DbConnector for FakeConnector {
    async fn test(&self, _conn: &DbConnection) -> Result<()> {
        self.tested.fetch_add(1, Ordering::SeqCst);
        self.test_result.clone()
    }

    async fn introspect(&self, _conn: &DbConnection) -> Result<Vec<TableSchema>> {
        self.tables.clone()
    }

    async fn execute(&self, _conn: &DbConnection, _sql: &str) -> Result<Vec<Row>> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        self.rows.clone()
    }
}

pub fn connection() -> DbConnection {
    let mut conn = DbConnectionInput {
        name: "shop".to_string(),
        engine: DbEngine::Postgresql,
        host: "localhost".to_string(),
        port: None,
        username: "analyst".to_string(),
        password_ref: "plain:secret".to_string(),
        database_name: "shop".to_string(),
        ssl_enabled: false,
    }
    .to_transient(1);
    conn.id = 1;
    conn
}

pub fn sales_schema() -> Vec<TableSchema> {
    vec![
        TableSchema {
            schema_name: "public".to_string(),
            table_name: "customers".to_string(),
            columns: vec![
                ColumnMeta::new("id", "integer", false),
                ColumnMeta::new("full_name", "text", false),
            ],
        },
        TableSchema {
            schema_name: "public".to_string(),
            table_name: "orders".to_string(),
            columns: vec![
                ColumnMeta::new("id", "integer", false),
                ColumnMeta::new("customer_id", "integer", false),
                ColumnMeta::new("created_at", "timestamp without time zone", true),
                ColumnMeta::new("total", "numeric", true),
            ],
        },
    ]
}

pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}
