pub mod chart;
pub mod connection;
pub mod error;
pub mod language;
pub mod llm_config;
pub mod query_record;
pub mod schema;
pub mod value;
