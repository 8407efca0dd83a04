//! Database values and their JSON-safe rendering.
//!
//! Connectors decode driver rows into [`SqlValue`]s; everything above the
//! connector only sees JSON rows produced by [`serialize_row`].

use crate::domain::error::{AppError, Result};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Number, Value};

/// One result row: column name to JSON value, in select-list order.
pub type Row = Map<String, Value>;

/// A decoded column value before JSON serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(BigDecimal),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(Value),
    /// A column whose type the connector could not decode; carries the type name.
    Unsupported(String),
}

/// Convert a value into JSON: dates become ISO-8601 strings, decimals become
/// floats. Unsupported values fail closed instead of being dropped.
pub fn serialize_for_json(value: &SqlValue) -> Result<Value> {
    let json = match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(*b),
        SqlValue::Int(i) => Value::Number((*i).into()),
        SqlValue::Float(f) => float_to_json(*f)?,
        SqlValue::Decimal(d) => {
            let f = d.to_f64().ok_or_else(|| {
                AppError::SerializationError(format!("Decimal {} is out of float range", d))
            })?;
            float_to_json(f)?
        }
        SqlValue::Text(s) => Value::String(s.clone()),
        SqlValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        SqlValue::Time(t) => Value::String(t.format("%H:%M:%S%.f").to_string()),
        SqlValue::Timestamp(ts) => Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        SqlValue::TimestampTz(ts) => Value::String(ts.to_rfc3339()),
        SqlValue::Json(v) => v.clone(),
        SqlValue::Unsupported(type_name) => {
            return Err(AppError::SerializationError(format!(
                "Unsupported column type: {}",
                type_name
            )))
        }
    };
    Ok(json)
}

fn float_to_json(f: f64) -> Result<Value> {
    Number::from_f64(f).map(Value::Number).ok_or_else(|| {
        AppError::SerializationError(format!("Non-finite float {} cannot be encoded", f))
    })
}

/// Serialize a decoded row, keeping column order.
pub fn serialize_row(columns: Vec<(String, SqlValue)>) -> Result<Row> {
    let mut row = Row::new();
    for (name, value) in columns {
        let json = serialize_for_json(&value)?;
        row.insert(name, json);
    }
    Ok(row)
}
