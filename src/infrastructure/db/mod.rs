pub mod connectors;
pub mod sqlite;
