pub mod chart_builder;
pub mod connection_service;
pub mod insight_generator;
pub mod language_detector;
pub mod query_executor;
pub mod query_history;
pub mod schema_introspector;
pub mod sql_generator;
pub mod sql_guard;
pub mod table_ranker;
pub mod text_to_sql;

#[cfg(test)]
pub mod test_support;
