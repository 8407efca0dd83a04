use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Column metadata as reported by introspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
}

impl ColumnMeta {
    pub fn new(name: &str, data_type: &str, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
            default: None,
            max_length: None,
            precision: None,
            scale: None,
        }
    }
}

/// One introspected table. Rebuilt per request, never cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableSchema {
    pub schema_name: String,
    pub table_name: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableSchema {
    pub fn qualified_name(&self) -> String {
        if self.schema_name.is_empty() {
            self.table_name.clone()
        } else {
            format!("{}.{}", self.schema_name, self.table_name)
        }
    }

    pub fn matches(&self, schema_name: Option<&str>, table_name: &str) -> bool {
        self.table_name == table_name
            && schema_name.map_or(true, |schema| schema == self.schema_name)
    }
}

/// A table the user curated for a connection, with the columns as they
/// looked when it was selected. Goes stale silently if the source changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedTable {
    pub id: i64,
    pub connection_id: i64,
    pub schema_name: Option<String>,
    pub table_name: String,
    pub is_selected: bool,
    pub columns_snapshot: Vec<ColumnMeta>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TableSelection {
    pub schema_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub table_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    OneToOne,
    #[default]
    OneToMany,
    ManyToMany,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub to_table: String,
    pub from_column: String,
    pub to_column: String,
    #[serde(default)]
    pub kind: RelationshipKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculatedField {
    pub field_name: String,
    pub expression: String,
    pub data_type: String,
    pub description: Option<String>,
}

/// Optional semantic layer over a raw table. Persisted but not yet fed
/// into SQL generation prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableModel {
    pub id: i64,
    pub connection_id: i64,
    pub table_name: String,
    pub model_name: String,
    pub description: Option<String>,
    pub primary_key_columns: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub calculated_fields: Vec<CalculatedField>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TableModelInput {
    #[validate(length(min = 1, max = 255))]
    pub table_name: String,
    #[validate(length(min = 1, max = 255))]
    pub model_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub primary_key_columns: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub calculated_fields: Vec<CalculatedField>,
}
