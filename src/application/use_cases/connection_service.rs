//! Connection lifecycle and curation.
//!
//! Connections are created only after a successful test-connect, are
//! re-tested when credentials change, and are soft-deleted. Every lookup is
//! scoped to the owning user; another user's connection is `NotFound`.

use crate::application::use_cases::schema_introspector::SchemaIntrospector;
use crate::domain::connection::{
    ConnectionStatus, DbConnection, DbConnectionInput, DbConnectionUpdate, TestConnectionResult,
};
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{SelectedTable, TableModel, TableModelInput, TableSchema, TableSelection};
use crate::infrastructure::db::connectors::ConnectorRegistry;
use crate::infrastructure::db::sqlite::SqliteRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub struct ConnectionService {
    repo: Arc<SqliteRepository>,
    connectors: ConnectorRegistry,
    introspector: SchemaIntrospector,
    max_active_per_user: i64,
}

impl ConnectionService {
    pub fn new(
        repo: Arc<SqliteRepository>,
        connectors: ConnectorRegistry,
        max_active_per_user: i64,
    ) -> Self {
        Self {
            repo,
            introspector: SchemaIntrospector::new(connectors.clone()),
            connectors,
            max_active_per_user,
        }
    }

    async fn test(&self, conn: &DbConnection) -> Result<()> {
        self.connectors.get(conn.engine)?.test(conn).await
    }

    /// Test-connects without persisting anything. Only invalid input is an error;
    /// an unreachable database is reported in the result.
    pub async fn test_connection_input(
        &self,
        user_id: i64,
        input: &DbConnectionInput,
    ) -> Result<TestConnectionResult> {
        input.validate()?;
        let conn = input.to_transient(user_id);
        match self.test(&conn).await {
            Ok(()) => Ok(TestConnectionResult {
                success: true,
                message: "Connection successful".to_string(),
            }),
            Err(e) => Ok(TestConnectionResult {
                success: false,
                message: e.to_string(),
            }),
        }
    }

    pub async fn create_connection(
        &self,
        user_id: i64,
        input: &DbConnectionInput,
    ) -> Result<DbConnection> {
        input.validate()?;

        let active = self.repo.count_active_connections(user_id).await?;
        if active >= self.max_active_per_user {
            return Err(AppError::ValidationError(format!(
                "Maximum of {} active connection(s) per user reached",
                self.max_active_per_user
            )));
        }

        let mut conn = input.to_transient(user_id);
        if let Err(e) = self.test(&conn).await {
            warn!(user_id, engine = conn.engine.as_str(), "Connection test failed: {}", e);
            return Err(AppError::ValidationError(format!(
                "Connection test failed: {}",
                e
            )));
        }
        conn.status = ConnectionStatus::Connected;
        conn.last_tested = Some(Utc::now());

        let saved = self.repo.insert_connection(&conn).await?;
        info!(
            user_id,
            connection_id = saved.id,
            engine = saved.engine.as_str(),
            "Connection created"
        );
        Ok(saved)
    }

    pub async fn get_connection(&self, user_id: i64, id: i64) -> Result<DbConnection> {
        self.repo
            .get_connection(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Connection {} not found", id)))
    }

    pub async fn list_connections(&self, user_id: i64) -> Result<Vec<DbConnection>> {
        self.repo.list_connections(user_id).await
    }

    /// Applies the patch. A credential change triggers a re-test whose
    /// outcome is stored as the new status; it does not reject the update.
    pub async fn update_connection(
        &self,
        user_id: i64,
        id: i64,
        patch: &DbConnectionUpdate,
    ) -> Result<DbConnection> {
        patch.validate()?;
        let mut conn = self.get_connection(user_id, id).await?;
        patch.apply(&mut conn);

        if patch.touches_credentials() {
            conn.status = match self.test(&conn).await {
                Ok(()) => ConnectionStatus::Connected,
                Err(e) => {
                    warn!(connection_id = id, "Re-test after update failed: {}", e);
                    ConnectionStatus::Failed
                }
            };
            conn.last_tested = Some(Utc::now());
        }
        conn.updated_at = Some(Utc::now());

        self.repo.update_connection(&conn).await?;
        info!(connection_id = id, status = conn.status.as_str(), "Connection updated");
        Ok(conn)
    }

    /// Soft delete. Query history keeps pointing at the id.
    pub async fn deactivate_connection(&self, user_id: i64, id: i64) -> Result<()> {
        let mut conn = self.get_connection(user_id, id).await?;
        conn.is_active = false;
        conn.updated_at = Some(Utc::now());
        self.repo.update_connection(&conn).await?;
        info!(connection_id = id, "Connection deactivated");
        Ok(())
    }

    pub async fn list_available_tables(&self, user_id: i64, id: i64) -> Result<Vec<TableSchema>> {
        let conn = self.get_connection(user_id, id).await?;
        self.introspector.introspect_strict(&conn).await
    }

    /// Replaces the curated selection, snapshotting each table's current columns.
    pub async fn select_tables(
        &self,
        user_id: i64,
        id: i64,
        selections: &[TableSelection],
    ) -> Result<Vec<SelectedTable>> {
        for selection in selections {
            selection.validate()?;
        }
        let conn = self.get_connection(user_id, id).await?;
        let available = self.introspector.introspect_strict(&conn).await?;

        let mut snapshot = Vec::with_capacity(selections.len());
        for selection in selections {
            let table = available
                .iter()
                .find(|t| t.matches(selection.schema_name.as_deref(), &selection.table_name))
                .ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "Unknown table: {}",
                        selection.table_name
                    ))
                })?;
            snapshot.push((
                Some(table.schema_name.clone()),
                table.table_name.clone(),
                table.columns.clone(),
            ));
        }

        let saved = self.repo.replace_selected_tables(conn.id, &snapshot).await?;
        info!(connection_id = id, tables = saved.len(), "Table selection replaced");
        Ok(saved)
    }

    pub async fn list_selected_tables(&self, user_id: i64, id: i64) -> Result<Vec<SelectedTable>> {
        let conn = self.get_connection(user_id, id).await?;
        self.repo.list_selected_tables(conn.id).await
    }

    pub async fn save_table_model(
        &self,
        user_id: i64,
        id: i64,
        input: &TableModelInput,
    ) -> Result<TableModel> {
        input.validate()?;
        let conn = self.get_connection(user_id, id).await?;
        self.repo.insert_table_model(conn.id, input).await
    }

    pub async fn list_table_models(&self, user_id: i64, id: i64) -> Result<Vec<TableModel>> {
        let conn = self.get_connection(user_id, id).await?;
        self.repo.list_table_models(conn.id).await
    }
}
