use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ConfigError(String),
    LLMError(String),
    SecurityError(String),
    DatabaseError(String),
    ConnectivityError(String),
    SerializationError(String),
    Unsupported(String),
    Timeout(String),
}

/// Machine-readable category attached to every failed query attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connectivity,
    Generation,
    Rejected,
    Execution,
    Serialization,
    Unsupported,
    Timeout,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connectivity => "connectivity",
            FailureKind::Generation => "generation",
            FailureKind::Rejected => "rejected",
            FailureKind::Execution => "execution",
            FailureKind::Serialization => "serialization",
            FailureKind::Unsupported => "unsupported",
            FailureKind::Timeout => "timeout",
            FailureKind::Internal => "internal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "connectivity" => Some(FailureKind::Connectivity),
            "generation" => Some(FailureKind::Generation),
            "rejected" => Some(FailureKind::Rejected),
            "execution" => Some(FailureKind::Execution),
            "serialization" => Some(FailureKind::Serialization),
            "unsupported" => Some(FailureKind::Unsupported),
            "timeout" => Some(FailureKind::Timeout),
            "internal" => Some(FailureKind::Internal),
            _ => None,
        }
    }
}

impl AppError {
    /// Category used when this error terminates a query attempt.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            AppError::ConnectivityError(_) => FailureKind::Connectivity,
            AppError::LLMError(_) => FailureKind::Generation,
            AppError::SecurityError(_) => FailureKind::Rejected,
            AppError::DatabaseError(_) => FailureKind::Execution,
            AppError::SerializationError(_) => FailureKind::Serialization,
            AppError::Unsupported(_) => FailureKind::Unsupported,
            AppError::Timeout(_) => FailureKind::Timeout,
            AppError::Internal(_)
            | AppError::NotFound(_)
            | AppError::ValidationError(_)
            | AppError::ConfigError(_) => FailureKind::Internal,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::ConnectivityError(msg) => write!(f, "Connectivity error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(
            AppError::SecurityError("DROP".into()).failure_kind(),
            FailureKind::Rejected
        );
        assert_eq!(
            AppError::LLMError("down".into()).failure_kind(),
            FailureKind::Generation
        );
        assert_eq!(
            AppError::ValidationError("bad".into()).failure_kind(),
            FailureKind::Internal
        );
    }

    #[test]
    fn test_failure_kind_round_trip_through_str() {
        for kind in [
            FailureKind::Connectivity,
            FailureKind::Generation,
            FailureKind::Rejected,
            FailureKind::Execution,
            FailureKind::Serialization,
            FailureKind::Unsupported,
            FailureKind::Timeout,
            FailureKind::Internal,
        ] {
            assert_eq!(FailureKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(FailureKind::parse("nope"), None);
    }

    #[test]
    fn test_display_prefix() {
        let err = AppError::Timeout("provider call".into());
        assert_eq!(err.to_string(), "Timeout: provider call");
    }
}
