//! Application store: registered connections, table selections, semantic
//! models and the append-only query log.

use crate::domain::chart::ChartConfig;
use crate::domain::connection::{ConnectionStatus, DbConnection, DbEngine};
use crate::domain::error::{AppError, FailureKind, Result};
use crate::domain::language::Language;
use crate::domain::query_record::{NewQueryRecord, QueryRecord};
use crate::domain::schema::{ColumnMeta, SelectedTable, TableModel, TableModelInput};
use crate::domain::value::Row;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::str::FromStr;

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS db_connections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        engine TEXT NOT NULL,
        host TEXT NOT NULL,
        port INTEGER NOT NULL,
        username TEXT NOT NULL,
        password_ref TEXT NOT NULL,
        database_name TEXT NOT NULL,
        ssl_enabled INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        status TEXT NOT NULL DEFAULT 'pending',
        last_tested DATETIME,
        created_at DATETIME NOT NULL,
        updated_at DATETIME
    )",
    "CREATE TABLE IF NOT EXISTS selected_tables (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        connection_id INTEGER NOT NULL REFERENCES db_connections(id),
        schema_name TEXT,
        table_name TEXT NOT NULL,
        is_selected INTEGER NOT NULL DEFAULT 1,
        columns_snapshot TEXT NOT NULL,
        created_at DATETIME NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS table_models (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        connection_id INTEGER NOT NULL REFERENCES db_connections(id),
        table_name TEXT NOT NULL,
        model_name TEXT NOT NULL,
        description TEXT,
        primary_key_columns TEXT NOT NULL,
        relationships TEXT NOT NULL,
        calculated_fields TEXT NOT NULL,
        created_at DATETIME NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS query_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        connection_id INTEGER,
        natural_language_query TEXT NOT NULL,
        generated_sql TEXT,
        execution_result TEXT NOT NULL,
        ai_insights TEXT NOT NULL,
        chart_config TEXT,
        execution_time_ms REAL NOT NULL,
        is_successful INTEGER NOT NULL,
        error_message TEXT,
        failure_kind TEXT,
        language TEXT NOT NULL,
        created_at DATETIME NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_query_records_user ON query_records (user_id, id)",
];

const CONNECTION_COLUMNS: &str = "id, user_id, name, engine, host, port, username, password_ref, \
     database_name, ssl_enabled, is_active, status, last_tested, created_at, updated_at";

const QUERY_RECORD_COLUMNS: &str = "id, user_id, connection_id, natural_language_query, \
     generated_sql, execution_result, ai_insights, chart_config, execution_time_ms, \
     is_successful, error_message, failure_kind, language, created_at";

pub struct SqliteRepository {
    pool: Pool<Sqlite>,
}

impl SqliteRepository {
    pub async fn init(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true);

        // Every connection to an in-memory database is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to create table: {}", e)))?;
        }

        Ok(Self { pool })
    }

    // Connections

    pub async fn insert_connection(&self, conn: &DbConnection) -> Result<DbConnection> {
        let result = sqlx::query(
            "INSERT INTO db_connections (user_id, name, engine, host, port, username, password_ref,
                 database_name, ssl_enabled, is_active, status, last_tested, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(conn.user_id)
        .bind(&conn.name)
        .bind(conn.engine.as_str())
        .bind(&conn.host)
        .bind(i64::from(conn.port))
        .bind(&conn.username)
        .bind(&conn.password_ref)
        .bind(&conn.database_name)
        .bind(conn.ssl_enabled)
        .bind(conn.is_active)
        .bind(conn.status.as_str())
        .bind(conn.last_tested)
        .bind(conn.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to save connection: {}", e)))?;

        let mut saved = conn.clone();
        saved.id = result.last_insert_rowid();
        Ok(saved)
    }

    pub async fn update_connection(&self, conn: &DbConnection) -> Result<()> {
        sqlx::query(
            "UPDATE db_connections
             SET name = ?, host = ?, port = ?, username = ?, password_ref = ?, database_name = ?,
                 ssl_enabled = ?, is_active = ?, status = ?, last_tested = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(&conn.name)
        .bind(&conn.host)
        .bind(i64::from(conn.port))
        .bind(&conn.username)
        .bind(&conn.password_ref)
        .bind(&conn.database_name)
        .bind(conn.ssl_enabled)
        .bind(conn.is_active)
        .bind(conn.status.as_str())
        .bind(conn.last_tested)
        .bind(conn.updated_at)
        .bind(conn.id)
        .bind(conn.user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update connection: {}", e)))?;
        Ok(())
    }

    /// Active connection owned by `user_id`, if any.
    pub async fn get_connection(&self, user_id: i64, id: i64) -> Result<Option<DbConnection>> {
        let sql = format!(
            "SELECT {} FROM db_connections WHERE id = ? AND user_id = ? AND is_active = 1",
            CONNECTION_COLUMNS
        );
        sqlx::query_as::<_, ConnectionEntity>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch connection: {}", e)))?
            .map(DbConnection::try_from)
            .transpose()
    }

    pub async fn list_connections(&self, user_id: i64) -> Result<Vec<DbConnection>> {
        let sql = format!(
            "SELECT {} FROM db_connections WHERE user_id = ? AND is_active = 1 ORDER BY id",
            CONNECTION_COLUMNS
        );
        sqlx::query_as::<_, ConnectionEntity>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list connections: {}", e)))?
            .into_iter()
            .map(DbConnection::try_from)
            .collect()
    }

    pub async fn count_active_connections(&self, user_id: i64) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM db_connections WHERE user_id = ? AND is_active = 1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count connections: {}", e)))
    }

    // Table selection

    /// Replaces the whole selection for a connection in one transaction.
    pub async fn replace_selected_tables(
        &self,
        connection_id: i64,
        tables: &[(Option<String>, String, Vec<ColumnMeta>)],
    ) -> Result<Vec<SelectedTable>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query("DELETE FROM selected_tables WHERE connection_id = ?")
            .bind(connection_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to clear selection: {}", e)))?;

        let now = Utc::now();
        let mut saved = Vec::with_capacity(tables.len());
        for (schema_name, table_name, columns) in tables {
            let snapshot = serde_json::to_string(columns)?;
            let result = sqlx::query(
                "INSERT INTO selected_tables
                     (connection_id, schema_name, table_name, is_selected, columns_snapshot, created_at)
                 VALUES (?, ?, ?, 1, ?, ?)",
            )
            .bind(connection_id)
            .bind(schema_name)
            .bind(table_name)
            .bind(snapshot)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to save selection: {}", e)))?;

            saved.push(SelectedTable {
                id: result.last_insert_rowid(),
                connection_id,
                schema_name: schema_name.clone(),
                table_name: table_name.clone(),
                is_selected: true,
                columns_snapshot: columns.clone(),
                created_at: now,
            });
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit selection: {}", e)))?;
        Ok(saved)
    }

    pub async fn list_selected_tables(&self, connection_id: i64) -> Result<Vec<SelectedTable>> {
        sqlx::query_as::<_, SelectedTableEntity>(
            "SELECT id, connection_id, schema_name, table_name, is_selected, columns_snapshot, created_at
             FROM selected_tables WHERE connection_id = ? AND is_selected = 1 ORDER BY id",
        )
        .bind(connection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list selection: {}", e)))?
        .into_iter()
        .map(SelectedTable::try_from)
        .collect()
    }

    // Semantic models

    pub async fn insert_table_model(
        &self,
        connection_id: i64,
        input: &TableModelInput,
    ) -> Result<TableModel> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO table_models (connection_id, table_name, model_name, description,
                 primary_key_columns, relationships, calculated_fields, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(connection_id)
        .bind(&input.table_name)
        .bind(&input.model_name)
        .bind(&input.description)
        .bind(serde_json::to_string(&input.primary_key_columns)?)
        .bind(serde_json::to_string(&input.relationships)?)
        .bind(serde_json::to_string(&input.calculated_fields)?)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to save table model: {}", e)))?;

        Ok(TableModel {
            id: result.last_insert_rowid(),
            connection_id,
            table_name: input.table_name.clone(),
            model_name: input.model_name.clone(),
            description: input.description.clone(),
            primary_key_columns: input.primary_key_columns.clone(),
            relationships: input.relationships.clone(),
            calculated_fields: input.calculated_fields.clone(),
            created_at: now,
        })
    }

    pub async fn list_table_models(&self, connection_id: i64) -> Result<Vec<TableModel>> {
        sqlx::query_as::<_, TableModelEntity>(
            "SELECT id, connection_id, table_name, model_name, description, primary_key_columns,
                 relationships, calculated_fields, created_at
             FROM table_models WHERE connection_id = ? ORDER BY id",
        )
        .bind(connection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list table models: {}", e)))?
        .into_iter()
        .map(TableModel::try_from)
        .collect()
    }

    // Query log

    pub async fn insert_query_record(&self, record: &NewQueryRecord) -> Result<QueryRecord> {
        let result = &record.result;
        let now = Utc::now();
        let execution_result = serde_json::to_string(&result.data)?;
        let chart_config = result
            .chart_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let inserted = sqlx::query(
            "INSERT INTO query_records (user_id, connection_id, natural_language_query,
                 generated_sql, execution_result, ai_insights, chart_config, execution_time_ms,
                 is_successful, error_message, failure_kind, language, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(record.connection_id)
        .bind(&record.natural_language_query)
        .bind(&result.sql)
        .bind(execution_result)
        .bind(&result.insights)
        .bind(chart_config)
        .bind(result.execution_time_ms)
        .bind(result.is_successful)
        .bind(&result.error_message)
        .bind(result.failure_kind.map(|kind| kind.as_str()))
        .bind(result.language.code())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to save query: {}", e)))?;

        Ok(QueryRecord {
            id: inserted.last_insert_rowid(),
            user_id: record.user_id,
            connection_id: record.connection_id,
            natural_language_query: record.natural_language_query.clone(),
            generated_sql: result.sql.clone(),
            execution_result: result.data.clone(),
            ai_insights: result.insights.clone(),
            chart_config: result.chart_config.clone(),
            execution_time_ms: result.execution_time_ms,
            is_successful: result.is_successful,
            error_message: result.error_message.clone(),
            failure_kind: result.failure_kind,
            language: result.language,
            created_at: now,
        })
    }

    /// Newest first.
    pub async fn list_query_records(&self, user_id: i64, limit: i64) -> Result<Vec<QueryRecord>> {
        let sql = format!(
            "SELECT {} FROM query_records WHERE user_id = ? ORDER BY id DESC LIMIT ?",
            QUERY_RECORD_COLUMNS
        );
        sqlx::query_as::<_, QueryRecordEntity>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch history: {}", e)))?
            .into_iter()
            .map(QueryRecord::try_from)
            .collect()
    }

    /// Total attempts, successful attempts and mean execution time.
    pub async fn query_counts(&self, user_id: i64) -> Result<(i64, i64, Option<f64>)> {
        sqlx::query_as::<_, (i64, i64, Option<f64>)>(
            "SELECT COUNT(id),
                    COALESCE(SUM(CASE WHEN is_successful = 1 THEN 1 ELSE 0 END), 0),
                    AVG(execution_time_ms)
             FROM query_records WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to compute stats: {}", e)))
    }
}

fn decode_json<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::DatabaseError(format!("Corrupt {} column: {}", field, e)))
}

// Internal entities for database mapping
#[derive(sqlx::FromRow)]
struct ConnectionEntity {
    id: i64,
    user_id: i64,
    name: String,
    engine: String,
    host: String,
    port: i64,
    username: String,
    password_ref: String,
    database_name: String,
    ssl_enabled: bool,
    is_active: bool,
    status: String,
    last_tested: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ConnectionEntity> for DbConnection {
    type Error = AppError;

    fn try_from(e: ConnectionEntity) -> Result<Self> {
        let engine = DbEngine::parse(&e.engine).ok_or_else(|| {
            AppError::DatabaseError(format!("Unknown engine '{}' on connection {}", e.engine, e.id))
        })?;
        let port = u16::try_from(e.port).map_err(|_| {
            AppError::DatabaseError(format!("Invalid port {} on connection {}", e.port, e.id))
        })?;

        Ok(Self {
            id: e.id,
            user_id: e.user_id,
            name: e.name,
            engine,
            host: e.host,
            port,
            username: e.username,
            password_ref: e.password_ref,
            database_name: e.database_name,
            ssl_enabled: e.ssl_enabled,
            is_active: e.is_active,
            status: ConnectionStatus::parse(&e.status),
            last_tested: e.last_tested,
            created_at: e.created_at,
            updated_at: e.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SelectedTableEntity {
    id: i64,
    connection_id: i64,
    schema_name: Option<String>,
    table_name: String,
    is_selected: bool,
    columns_snapshot: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SelectedTableEntity> for SelectedTable {
    type Error = AppError;

    fn try_from(e: SelectedTableEntity) -> Result<Self> {
        Ok(Self {
            id: e.id,
            connection_id: e.connection_id,
            schema_name: e.schema_name,
            table_name: e.table_name,
            is_selected: e.is_selected,
            columns_snapshot: decode_json("columns_snapshot", &e.columns_snapshot)?,
            created_at: e.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TableModelEntity {
    id: i64,
    connection_id: i64,
    table_name: String,
    model_name: String,
    description: Option<String>,
    primary_key_columns: String,
    relationships: String,
    calculated_fields: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TableModelEntity> for TableModel {
    type Error = AppError;

    fn try_from(e: TableModelEntity) -> Result<Self> {
        Ok(Self {
            id: e.id,
            connection_id: e.connection_id,
            table_name: e.table_name,
            model_name: e.model_name,
            description: e.description,
            primary_key_columns: decode_json("primary_key_columns", &e.primary_key_columns)?,
            relationships: decode_json("relationships", &e.relationships)?,
            calculated_fields: decode_json("calculated_fields", &e.calculated_fields)?,
            created_at: e.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QueryRecordEntity {
    id: i64,
    user_id: i64,
    connection_id: Option<i64>,
    natural_language_query: String,
    generated_sql: Option<String>,
    execution_result: String,
    ai_insights: String,
    chart_config: Option<String>,
    execution_time_ms: f64,
    is_successful: bool,
    error_message: Option<String>,
    failure_kind: Option<String>,
    language: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<QueryRecordEntity> for QueryRecord {
    type Error = AppError;

    fn try_from(e: QueryRecordEntity) -> Result<Self> {
        let execution_result: Vec<Row> = decode_json("execution_result", &e.execution_result)?;
        let chart_config: Option<ChartConfig> = e
            .chart_config
            .as_deref()
            .map(|raw| decode_json("chart_config", raw))
            .transpose()?;

        Ok(Self {
            id: e.id,
            user_id: e.user_id,
            connection_id: e.connection_id,
            natural_language_query: e.natural_language_query,
            generated_sql: e.generated_sql,
            execution_result,
            ai_insights: e.ai_insights,
            chart_config,
            execution_time_ms: e.execution_time_ms,
            is_successful: e.is_successful,
            error_message: e.error_message,
            failure_kind: e.failure_kind.as_deref().and_then(FailureKind::parse),
            language: Language::from_code(&e.language).unwrap_or(Language::FALLBACK),
            created_at: e.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::DbConnectionInput;
    use crate::domain::query_record::GenerationResult;
    use crate::domain::schema::Relationship;
    use serde_json::json;

    async fn repo() -> SqliteRepository {
        SqliteRepository::init("sqlite::memory:").await.unwrap()
    }

    fn connection(user_id: i64) -> DbConnection {
        DbConnectionInput {
            name: "warehouse".to_string(),
            engine: DbEngine::Postgresql,
            host: "db.internal".to_string(),
            port: None,
            username: "analyst".to_string(),
            password_ref: "env:WAREHOUSE_PW".to_string(),
            database_name: "sales".to_string(),
            ssl_enabled: true,
        }
        .to_transient(user_id)
    }

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_connection_round_trip_and_soft_delete() {
        let repo = repo().await;
        let mut conn = repo.insert_connection(&connection(1)).await.unwrap();
        assert!(conn.id > 0);

        let fetched = repo.get_connection(1, conn.id).await.unwrap().unwrap();
        assert_eq!(fetched.engine, DbEngine::Postgresql);
        assert_eq!(fetched.port, 5432);
        assert_eq!(fetched.password_ref, "env:WAREHOUSE_PW");

        // Other users cannot see it.
        assert!(repo.get_connection(2, conn.id).await.unwrap().is_none());
        assert_eq!(repo.count_active_connections(1).await.unwrap(), 1);

        conn.is_active = false;
        conn.updated_at = Some(Utc::now());
        repo.update_connection(&conn).await.unwrap();
        assert!(repo.get_connection(1, conn.id).await.unwrap().is_none());
        assert_eq!(repo.count_active_connections(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_selection_is_replaced() {
        let repo = repo().await;
        let conn = repo.insert_connection(&connection(1)).await.unwrap();

        let first = vec![
            (
                Some("public".to_string()),
                "orders".to_string(),
                vec![ColumnMeta::new("id", "integer", false)],
            ),
            (Some("public".to_string()), "customers".to_string(), vec![]),
        ];
        repo.replace_selected_tables(conn.id, &first).await.unwrap();

        let second = vec![(
            Some("public".to_string()),
            "products".to_string(),
            vec![ColumnMeta::new("price", "numeric", true)],
        )];
        repo.replace_selected_tables(conn.id, &second).await.unwrap();

        let selected = repo.list_selected_tables(conn.id).await.unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].table_name, "products");
        assert_eq!(selected[0].columns_snapshot[0].data_type, "numeric");
    }

    #[tokio::test]
    async fn test_table_model_round_trip() {
        let repo = repo().await;
        let conn = repo.insert_connection(&connection(1)).await.unwrap();
        let input = TableModelInput {
            table_name: "orders".to_string(),
            model_name: "Orders".to_string(),
            description: Some("Customer orders".to_string()),
            primary_key_columns: vec!["id".to_string()],
            relationships: vec![Relationship {
                to_table: "customers".to_string(),
                from_column: "customer_id".to_string(),
                to_column: "id".to_string(),
                kind: Default::default(),
            }],
            calculated_fields: vec![],
        };
        repo.insert_table_model(conn.id, &input).await.unwrap();

        let models = repo.list_table_models(conn.id).await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].relationships[0].to_table, "customers");
        assert_eq!(models[0].primary_key_columns, vec!["id".to_string()]);
    }

    #[tokio::test]
    async fn test_query_log_newest_first_with_stats() {
        let repo = repo().await;

        let ok = GenerationResult::success(
            "SELECT month, total FROM sales".to_string(),
            vec![row(json!({"month": "Jan", "total": 5}))],
            "Sales grew.".to_string(),
            crate::domain::chart::ChartConfig::NoChart(crate::domain::chart::NoChart {
                reason: crate::domain::chart::NoChartReason::InsufficientData,
                message: "Not enough data".to_string(),
                summary: None,
            }),
            10.0,
            Language::English,
        );
        repo.insert_query_record(&NewQueryRecord::new(1, Some(4), "monthly sales", ok))
            .await
            .unwrap();

        let failed = GenerationResult::failure(
            Some("DROP TABLE sales".to_string()),
            &AppError::SecurityError("Query contains forbidden keyword: DROP".to_string()),
            Language::Russian,
        );
        repo.insert_query_record(&NewQueryRecord::new(1, Some(4), "удали продажи", failed))
            .await
            .unwrap();

        let history = repo.list_query_records(1, 50).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].natural_language_query, "удали продажи");
        assert_eq!(history[0].failure_kind, Some(FailureKind::Rejected));
        assert_eq!(history[0].language, Language::Russian);
        assert!(history[0].execution_result.is_empty());

        assert!(history[1].is_successful);
        let keys: Vec<&String> = history[1].execution_result[0].keys().collect();
        assert_eq!(keys, vec!["month", "total"]);
        assert!(history[1].chart_config.is_some());

        let (total, successful, avg) = repo.query_counts(1).await.unwrap();
        assert_eq!((total, successful), (2, 1));
        assert_eq!(avg, Some(5.0));

        assert!(repo.list_query_records(2, 50).await.unwrap().is_empty());
    }
}
