use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Database engines a connection may target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DbEngine {
    #[serde(alias = "postgres")]
    Postgresql,
    Mysql,
    Sqlite,
}

impl DbEngine {
    pub const ALL: [DbEngine; 3] = [DbEngine::Postgresql, DbEngine::Mysql, DbEngine::Sqlite];

    pub fn as_str(&self) -> &'static str {
        match self {
            DbEngine::Postgresql => "postgresql",
            DbEngine::Mysql => "mysql",
            DbEngine::Sqlite => "sqlite",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" => Some(DbEngine::Postgresql),
            "mysql" => Some(DbEngine::Mysql),
            "sqlite" => Some(DbEngine::Sqlite),
            _ => None,
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbEngine::Postgresql => Some(5432),
            DbEngine::Mysql => Some(3306),
            DbEngine::Sqlite => None,
        }
    }

    /// Dialect name used in generation prompts.
    pub fn dialect(&self) -> &'static str {
        match self {
            DbEngine::Postgresql => "PostgreSQL",
            DbEngine::Mysql => "MySQL",
            DbEngine::Sqlite => "SQLite",
        }
    }
}

impl fmt::Display for DbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Failed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "connected" => ConnectionStatus::Connected,
            "failed" => ConnectionStatus::Failed,
            _ => ConnectionStatus::Pending,
        }
    }
}

/// A registered target database owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConnection {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub engine: DbEngine,
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Reference resolved at call time: `env:NAME`, `keychain:NAME`, `plain:VALUE` or a bare value.
    #[serde(skip_serializing)]
    pub password_ref: String,
    pub database_name: String,
    pub ssl_enabled: bool,
    pub is_active: bool,
    pub status: ConnectionStatus,
    pub last_tested: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DbConnectionInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub engine: DbEngine,
    #[validate(length(min = 1, max = 255))]
    pub host: String,
    pub port: Option<u16>,
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password_ref: String,
    #[validate(length(min = 1, max = 255))]
    pub database_name: String,
    #[serde(default)]
    pub ssl_enabled: bool,
}

impl DbConnectionInput {
    pub fn resolved_port(&self) -> u16 {
        self.port
            .or_else(|| self.engine.default_port())
            .unwrap_or_default()
    }

    /// Unsaved connection shape used for test-connects before persistence.
    pub fn to_transient(&self, user_id: i64) -> DbConnection {
        DbConnection {
            id: 0,
            user_id,
            name: self.name.clone(),
            engine: self.engine,
            host: self.host.clone(),
            port: self.resolved_port(),
            username: self.username.clone(),
            password_ref: self.password_ref.clone(),
            database_name: self.database_name.clone(),
            ssl_enabled: self.ssl_enabled,
            is_active: true,
            status: ConnectionStatus::Pending,
            last_tested: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Partial update; unset fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DbConnectionUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub host: Option<String>,
    pub port: Option<u16>,
    #[validate(length(min = 1, max = 255))]
    pub username: Option<String>,
    #[validate(length(min = 1))]
    pub password_ref: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub database_name: Option<String>,
    pub ssl_enabled: Option<bool>,
}

impl DbConnectionUpdate {
    pub fn touches_credentials(&self) -> bool {
        self.host.is_some()
            || self.port.is_some()
            || self.username.is_some()
            || self.password_ref.is_some()
            || self.database_name.is_some()
            || self.ssl_enabled.is_some()
    }

    pub fn apply(&self, conn: &mut DbConnection) {
        if let Some(name) = &self.name {
            conn.name = name.clone();
        }
        if let Some(host) = &self.host {
            conn.host = host.clone();
        }
        if let Some(port) = self.port {
            conn.port = port;
        }
        if let Some(username) = &self.username {
            conn.username = username.clone();
        }
        if let Some(password_ref) = &self.password_ref {
            conn.password_ref = password_ref.clone();
        }
        if let Some(database_name) = &self.database_name {
            conn.database_name = database_name.clone();
        }
        if let Some(ssl_enabled) = self.ssl_enabled {
            conn.ssl_enabled = ssl_enabled;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConnectionResult {
    pub success: bool,
    pub message: String,
}
