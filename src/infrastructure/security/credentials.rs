//! Connection password resolution.
//!
//! Connections never store a password directly; they store a reference:
//! - `env:NAME` reads the `NAME` environment variable
//! - `keychain:NAME` reads the OS keychain entry `NAME`
//! - `plain:VALUE` uses `VALUE` verbatim (development only)
//! - anything else is treated as the password itself

use crate::domain::error::{AppError, Result};
use keyring::Entry;

const KEYCHAIN_USER: &str = "genbi";

pub struct KeyringManager {
    user: String,
}

impl KeyringManager {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
        }
    }

    pub fn get_secret(&self, key: &str) -> Result<String> {
        let entry = Entry::new(key, &self.user)
            .map_err(|e| AppError::SecurityError(format!("Failed to create entry: {}", e)))?;

        entry
            .get_password()
            .map_err(|e| AppError::SecurityError(format!("Failed to get password: {}", e)))
    }
}

impl Default for KeyringManager {
    fn default() -> Self {
        Self::new(KEYCHAIN_USER)
    }
}

pub fn resolve_password(password_ref: &str) -> Result<String> {
    if let Some(env_key) = password_ref.strip_prefix("env:") {
        std::env::var(env_key).map_err(|_| {
            AppError::ValidationError(format!(
                "Environment variable '{}' not found for password",
                env_key
            ))
        })
    } else if let Some(key_name) = password_ref.strip_prefix("keychain:") {
        KeyringManager::default().get_secret(key_name)
    } else if let Some(plain) = password_ref.strip_prefix("plain:") {
        Ok(plain.to_string())
    } else {
        Ok(password_ref.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_password_env() {
        std::env::set_var("GENBI_TEST_DB_PASSWORD", "secret123");
        let result = resolve_password("env:GENBI_TEST_DB_PASSWORD");
        assert_eq!(result.unwrap(), "secret123");
        std::env::remove_var("GENBI_TEST_DB_PASSWORD");
    }

    #[test]
    fn test_resolve_password_missing_env() {
        let result = resolve_password("env:GENBI_TEST_SURELY_UNSET_VAR");
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_resolve_password_plain_and_direct() {
        assert_eq!(resolve_password("plain:hunter2").unwrap(), "hunter2");
        assert_eq!(resolve_password("direct_password").unwrap(), "direct_password");
    }
}
