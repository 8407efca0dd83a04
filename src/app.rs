use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::{ConnectionService, QueryHistoryService, TextToSqlService};
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::connectors::{ConnectorRegistry, ConnectorTimeouts};
use crate::infrastructure::db::sqlite::SqliteRepository;
use crate::infrastructure::llm_clients::pool::GenerationPool;
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use crate::interfaces::http::{start_server, HttpState};

/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn build_state(config: &AppConfig) -> Result<HttpState> {
    let repo = Arc::new(SqliteRepository::init(&config.database_url).await?);

    let connectors = ConnectorRegistry::with_defaults(ConnectorTimeouts {
        connect: Duration::from_secs(config.connect_timeout_secs),
        query: Duration::from_secs(config.query_timeout_secs),
    });

    let llm_client: Arc<dyn LLMClient> = Arc::new(RouterClient::new());
    let pool = GenerationPool::new(
        llm_client,
        config.llm.clone(),
        config.provider_workers,
        Duration::from_secs(config.provider_timeout_secs),
    );

    Ok(HttpState {
        text_to_sql: TextToSqlService::new(
            connectors.clone(),
            pool,
            config.prompt_token_budget,
        ),
        connections: ConnectionService::new(
            repo.clone(),
            connectors,
            config.max_active_connections_per_user,
        ),
        history: QueryHistoryService::new(repo),
    })
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.log_level);

    info!(
        provider = ?config.llm.provider,
        model = %config.llm.model,
        workers = config.provider_workers,
        "Starting genbi"
    );

    let state = build_state(&config).await?;
    let server = start_server(state, &config.http)?;
    server.await?;
    Ok(())
}
