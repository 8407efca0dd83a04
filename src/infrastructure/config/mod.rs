//! Application configuration.
//!
//! Values are layered: built-in defaults, then `genbi.toml` (or the file
//! named by `GENBI_CONFIG`), then `GENBI_*` environment variables with `__`
//! separating nested keys (`GENBI_LLM__MODEL=gpt-4o`). A `.env` file is
//! loaded before anything else.

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "genbi.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application store holding connections and the query log.
    pub database_url: String,
    pub llm: LLMConfig,
    /// Upper bound on estimated tokens spent on schema context.
    pub prompt_token_budget: usize,
    pub provider_workers: usize,
    pub provider_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub query_timeout_secs: u64,
    pub max_active_connections_per_user: i64,
    pub http: HttpConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://genbi.db".to_string(),
            llm: LLMConfig::default(),
            prompt_token_budget: 6000,
            provider_workers: 4,
            provider_timeout_secs: 60,
            connect_timeout_secs: 10,
            query_timeout_secs: 30,
            max_active_connections_per_user: 1,
            http: HttpConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        let config_file =
            std::env::var("GENBI_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("GENBI_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        if config.llm.api_key.as_deref().map_or(true, str::is_empty) {
            config.llm.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.provider_workers == 0 {
            return Err(AppError::ConfigError(
                "provider_workers must be at least 1".to_string(),
            ));
        }
        if self.prompt_token_budget == 0 {
            return Err(AppError::ConfigError(
                "prompt_token_budget must be greater than 0".to_string(),
            ));
        }
        if self.database_url.trim().is_empty() {
            return Err(AppError::ConfigError("database_url is required".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AppError::ConfigError("llm.model is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMProvider;

    fn base() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::from_figment(base()).unwrap();
        assert_eq!(config.provider_workers, 4);
        assert_eq!(config.prompt_token_budget, 6000);
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
    }

    #[test]
    fn test_toml_overrides_nested_keys() {
        let figment = base().merge(Toml::string(
            r#"
            prompt_token_budget = 2500

            [llm]
            provider = "openrouter"
            model = "anthropic/claude-3-haiku"
            api_key = "sk-test"
            "#,
        ));
        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.prompt_token_budget, 2500);
        assert_eq!(config.llm.provider, LLMProvider::OpenRouter);
        assert_eq!(config.llm.model, "anthropic/claude-3-haiku");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let figment = base().merge(Toml::string("provider_workers = 0"));
        let err = AppConfig::from_figment(figment).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
