use super::{ConnectorTimeouts, DbConnector, SYSTEM_SCHEMAS};
use crate::domain::connection::DbConnection;
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{ColumnMeta, TableSchema};
use crate::domain::value::{serialize_row, Row, SqlValue};
use crate::infrastructure::security::credentials::resolve_password;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{Column, Connection, Row as _, TypeInfo, ValueRef};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

const LIST_TABLES_SQL: &str = r#"
    SELECT schemaname::text AS schema_name, tablename::text AS table_name
    FROM pg_catalog.pg_tables
    WHERE schemaname <> ALL($1)
    ORDER BY schemaname, tablename
"#;

const LIST_COLUMNS_SQL: &str = r#"
    SELECT
        table_schema::text AS table_schema,
        table_name::text AS table_name,
        column_name::text AS column_name,
        data_type::text AS data_type,
        is_nullable = 'YES' AS nullable,
        column_default::text AS column_default,
        character_maximum_length::int4 AS max_length,
        numeric_precision::int4 AS numeric_precision,
        numeric_scale::int4 AS numeric_scale
    FROM information_schema.columns
    WHERE table_schema <> ALL($1)
    ORDER BY table_schema, table_name, ordinal_position
"#;

pub struct PostgresConnector {
    timeouts: ConnectorTimeouts,
}

impl PostgresConnector {
    pub fn new(timeouts: ConnectorTimeouts) -> Self {
        Self { timeouts }
    }

    fn ssl_mode(conn: &DbConnection) -> PgSslMode {
        if conn.ssl_enabled {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        }
    }

    fn build_options(conn: &DbConnection, password: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&conn.host)
            .port(conn.port)
            .database(&conn.database_name)
            .username(&conn.username)
            .password(password)
            .ssl_mode(Self::ssl_mode(conn))
    }

    async fn connect(&self, conn: &DbConnection) -> Result<PgConnection> {
        let password = resolve_password(&conn.password_ref)?;
        let options = Self::build_options(conn, &password);

        match tokio::time::timeout(self.timeouts.connect, PgConnection::connect_with(&options))
            .await
        {
            Ok(Ok(db)) => Ok(db),
            Ok(Err(e)) => Err(AppError::ConnectivityError(format!(
                "Failed to connect to PostgreSQL at {}:{}/{}: {}",
                conn.host, conn.port, conn.database_name, e
            ))),
            Err(_) => Err(AppError::ConnectivityError(format!(
                "Connection timed out after {} seconds",
                self.timeouts.connect.as_secs()
            ))),
        }
    }

    async fn close(db: PgConnection, conn: &DbConnection) {
        if let Err(e) = db.close().await {
            warn!(connection_id = conn.id, "Failed to close PostgreSQL connection: {}", e);
        }
    }

    async fn fetch(&self, db: &mut PgConnection, query: PgQuery<'_>) -> Result<Vec<PgRow>> {
        tokio::time::timeout(self.timeouts.query, query.fetch_all(db))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "Query timed out after {} seconds",
                    self.timeouts.query.as_secs()
                ))
            })?
            .map_err(|e| AppError::DatabaseError(format!("Query execution failed: {}", e)))
    }

    async fn read_schema(&self, db: &mut PgConnection) -> Result<Vec<TableSchema>> {
        let excluded: Vec<String> = SYSTEM_SCHEMAS.iter().map(|s| s.to_string()).collect();

        let table_rows = self
            .fetch(db, sqlx::query(LIST_TABLES_SQL).bind(excluded.clone()))
            .await?;
        let column_rows = self
            .fetch(db, sqlx::query(LIST_COLUMNS_SQL).bind(excluded))
            .await?;

        let mut columns: HashMap<(String, String), Vec<ColumnMeta>> = HashMap::new();
        for row in &column_rows {
            let key = (
                get::<String>(row, "table_schema")?,
                get::<String>(row, "table_name")?,
            );
            let column = ColumnMeta {
                name: get(row, "column_name")?,
                data_type: get(row, "data_type")?,
                nullable: get(row, "nullable")?,
                default: get(row, "column_default")?,
                max_length: get(row, "max_length")?,
                precision: get(row, "numeric_precision")?,
                scale: get(row, "numeric_scale")?,
            };
            columns.entry(key).or_default().push(column);
        }

        let mut tables = Vec::with_capacity(table_rows.len());
        for row in &table_rows {
            let schema_name: String = get(row, "schema_name")?;
            let table_name: String = get(row, "table_name")?;
            let table_columns = columns
                .remove(&(schema_name.clone(), table_name.clone()))
                .unwrap_or_default();
            tables.push(TableSchema {
                schema_name,
                table_name,
                columns: table_columns,
            });
        }

        Ok(tables)
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| AppError::DatabaseError(format!("Failed to parse {}: {}", column, e)))
}

fn decode_value(row: &PgRow, index: usize) -> Result<SqlValue> {
    let column = &row.columns()[index];

    let raw = row
        .try_get_raw(index)
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let type_name = column.type_info().name().to_string();
    let decoded = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(index).map(SqlValue::Bool),
        "INT2" => row.try_get::<i16, _>(index).map(|n| SqlValue::Int(n.into())),
        "INT4" => row.try_get::<i32, _>(index).map(|n| SqlValue::Int(n.into())),
        "INT8" => row.try_get::<i64, _>(index).map(SqlValue::Int),
        "OID" => row
            .try_get::<sqlx::postgres::types::Oid, _>(index)
            .map(|oid| SqlValue::Int(oid.0.into())),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|f| SqlValue::Float(f.into())),
        "FLOAT8" => row.try_get::<f64, _>(index).map(SqlValue::Float),
        "NUMERIC" => row.try_get::<BigDecimal, _>(index).map(SqlValue::Decimal),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" | "UNKNOWN" => {
            row.try_get::<String, _>(index).map(SqlValue::Text)
        }
        "UUID" => row
            .try_get::<uuid::Uuid, _>(index)
            .map(|id| SqlValue::Text(id.to_string())),
        "DATE" => row.try_get::<NaiveDate, _>(index).map(SqlValue::Date),
        "TIME" => row.try_get::<NaiveTime, _>(index).map(SqlValue::Time),
        "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(index).map(SqlValue::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(SqlValue::TimestampTz),
        "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(index).map(SqlValue::Json),
        _ => return Ok(SqlValue::Unsupported(type_name)),
    };

    decoded.map_err(|e| {
        AppError::SerializationError(format!(
            "Failed to decode column '{}' ({}): {}",
            column.name(),
            type_name,
            e
        ))
    })
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut values = Vec::with_capacity(row.columns().len());
    for (index, column) in row.columns().iter().enumerate() {
        values.push((column.name().to_string(), decode_value(row, index)?));
    }
    serialize_row(values)
}

#[async_trait]
impl DbConnector for PostgresConnector {
    async fn test(&self, conn: &DbConnection) -> Result<()> {
        let mut db = self.connect(conn).await?;
        let result = self
            .fetch(&mut db, sqlx::query("SELECT 1 AS health_check"))
            .await
            .map(|_| ());
        Self::close(db, conn).await;
        result
    }

    async fn introspect(&self, conn: &DbConnection) -> Result<Vec<TableSchema>> {
        let mut db = self.connect(conn).await?;
        let result = self.read_schema(&mut db).await;
        Self::close(db, conn).await;

        if let Ok(tables) = &result {
            info!(
                connection_id = conn.id,
                tables = tables.len(),
                "Introspected PostgreSQL schema"
            );
        }
        result
    }

    async fn execute(&self, conn: &DbConnection, sql: &str) -> Result<Vec<Row>> {
        let started = Instant::now();
        let mut db = self.connect(conn).await?;
        let result = self.fetch(&mut db, sqlx::query(sql)).await;
        Self::close(db, conn).await;

        let rows = result?.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
        debug!(
            connection_id = conn.id,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Executed statement"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::{DbConnectionInput, DbEngine};

    fn conn(ssl_enabled: bool, password_ref: &str) -> DbConnection {
        DbConnectionInput {
            name: "warehouse".to_string(),
            engine: DbEngine::Postgresql,
            host: "127.0.0.1".to_string(),
            port: Some(1),
            username: "analyst".to_string(),
            password_ref: password_ref.to_string(),
            database_name: "sales".to_string(),
            ssl_enabled,
        }
        .to_transient(1)
    }

    #[test]
    fn test_ssl_mode_follows_flag() {
        assert!(matches!(
            PostgresConnector::ssl_mode(&conn(true, "plain:x")),
            PgSslMode::Require
        ));
        assert!(matches!(
            PostgresConnector::ssl_mode(&conn(false, "plain:x")),
            PgSslMode::Prefer
        ));
    }

    #[tokio::test]
    async fn test_missing_password_env_fails_before_connecting() {
        let connector = PostgresConnector::new(ConnectorTimeouts::default());
        let err = connector
            .test(&conn(false, "env:GENBI_TEST_UNSET_PASSWORD"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connectivity_error() {
        let connector = PostgresConnector::new(ConnectorTimeouts {
            connect: std::time::Duration::from_secs(2),
            query: std::time::Duration::from_secs(2),
        });
        let err = connector.introspect(&conn(false, "plain:x")).await.unwrap_err();
        assert!(matches!(err, AppError::ConnectivityError(_)));
    }
}
