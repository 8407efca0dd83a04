pub mod use_cases;

pub use use_cases::connection_service::ConnectionService;
pub use use_cases::query_history::QueryHistoryService;
pub use use_cases::text_to_sql::TextToSqlService;
