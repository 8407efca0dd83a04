//! Denylist check run before any generated statement reaches a database.
//!
//! This is whole-word keyword matching, not a SQL parser. It rejects a
//! keyword inside a string literal or identifier (`SELECT 'drop'`) and it
//! cannot see through obfuscation. It is advisory only; the real boundary
//! must be a read-only database role.

use crate::domain::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

pub const FORBIDDEN_KEYWORDS: [&str; 11] = [
    "DROP", "DELETE", "INSERT", "UPDATE", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE",
    "GRANT", "REVOKE",
];

static FORBIDDEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", FORBIDDEN_KEYWORDS.join("|"))).unwrap()
});

/// First forbidden keyword in `sql`, uppercased.
pub fn find_forbidden_keyword(sql: &str) -> Option<String> {
    FORBIDDEN_PATTERN
        .find(sql)
        .map(|keyword| keyword.as_str().to_uppercase())
}

pub fn check_sql(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(AppError::ValidationError("SQL statement is empty".to_string()));
    }
    match find_forbidden_keyword(sql) {
        Some(keyword) => Err(AppError::SecurityError(format!(
            "Query contains forbidden keyword: {}",
            keyword
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_accepted() {
        assert!(check_sql("SELECT name FROM products").is_ok());
    }

    #[test]
    fn test_stacked_drop_rejected() {
        let err = check_sql("SELECT * FROM t; DROP TABLE t").unwrap_err();
        assert_eq!(
            err,
            AppError::SecurityError("Query contains forbidden keyword: DROP".to_string())
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            find_forbidden_keyword("select 1; delete from users"),
            Some("DELETE".to_string())
        );
        assert_eq!(
            find_forbidden_keyword("ExEcUtE sp_who"),
            Some("EXECUTE".to_string())
        );
    }

    #[test]
    fn test_whole_words_only() {
        assert!(check_sql("SELECT updated_at, created_by FROM orders").is_ok());
        assert!(check_sql("SELECT * FROM dropship_orders").is_ok());
    }

    #[test]
    fn test_literal_is_over_rejected() {
        // Known limitation: keywords inside literals still match.
        assert!(check_sql("SELECT * FROM logs WHERE action = 'delete'").is_err());
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(check_sql("  "), Err(AppError::ValidationError(_))));
    }
}
