//! Live schema introspection and its flat text rendering.
//!
//! Connectivity problems degrade to an empty table list (logged) so the
//! caller can report "no usable schema". An engine without a connector is
//! not a connectivity problem and is returned as an error.

use crate::domain::connection::DbConnection;
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{SelectedTable, TableSchema};
use crate::infrastructure::db::connectors::ConnectorRegistry;
use std::fmt::Write;
use tracing::{info, warn};

pub struct SchemaIntrospector {
    connectors: ConnectorRegistry,
}

impl SchemaIntrospector {
    pub fn new(connectors: ConnectorRegistry) -> Self {
        Self { connectors }
    }

    pub async fn introspect(&self, conn: &DbConnection) -> Result<Vec<TableSchema>> {
        let connector = self.connectors.get(conn.engine)?;
        match connector.introspect(conn).await {
            Ok(tables) => {
                info!(
                    connection_id = conn.id,
                    engine = conn.engine.as_str(),
                    tables = tables.len(),
                    "Schema introspected"
                );
                Ok(tables)
            }
            Err(e @ AppError::Unsupported(_)) => Err(e),
            Err(e) => {
                warn!(
                    connection_id = conn.id,
                    engine = conn.engine.as_str(),
                    "Introspection failed, treating schema as empty: {}",
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Introspects and propagates every failure. Used where the caller must
    /// tell an unreachable database from an empty one.
    pub async fn introspect_strict(&self, conn: &DbConnection) -> Result<Vec<TableSchema>> {
        self.connectors.get(conn.engine)?.introspect(conn).await
    }
}

/// Keeps only the curated tables, or everything when nothing is curated.
pub fn restrict_to_selection(
    tables: Vec<TableSchema>,
    selection: &[SelectedTable],
) -> Vec<TableSchema> {
    let selected: Vec<&SelectedTable> = selection.iter().filter(|s| s.is_selected).collect();
    if selected.is_empty() {
        return tables;
    }
    tables
        .into_iter()
        .filter(|table| {
            selected
                .iter()
                .any(|s| table.matches(s.schema_name.as_deref(), &s.table_name))
        })
        .collect()
}

/// Renders the flat listing consumed by the relevance ranker.
pub fn render_schema_listing(conn: &DbConnection, tables: &[TableSchema]) -> String {
    let mut listing = format!("Database: {} ({})\n\n", conn.database_name, conn.engine);

    for table in tables {
        let _ = writeln!(listing, "Table: {}", table.qualified_name());
        listing.push_str("Columns:\n");
        for column in &table.columns {
            let nullable = if column.nullable { "NULL" } else { "NOT NULL" };
            let _ = writeln!(listing, "  - {}: {} {}", column.name, column.data_type, nullable);
        }
        listing.push('\n');
    }

    listing
}
