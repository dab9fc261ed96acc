use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use lib_site::connections::{seed_defaults, ContentStore, Database, MemoryStore};
use lib_site::strategy::{StrategyClient, DEFAULT_BASE_URL, DEFAULT_MODEL};

use super::config::Config;

/// Opens MySQL when a database URL is configured, otherwise an in-memory store.
pub async fn open_store(config: &Config) -> Result<Arc<dyn ContentStore>> {
    let store: Arc<dyn ContentStore> = match config.database_url() {
        Some(url) => {
            let db = Database::new(url, config.max_db_connections.unwrap_or(5))
                .await
                .context("Cannot connect to MySQL")?;
            db.ensure_schema().await.context("Cannot prepare content tables")?;
            info!("Content store: MySQL");
            Arc::new(db)
        }
        None => {
            warn!("No DATABASE_URL configured: content is kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.seed() {
        let written = seed_defaults(store.as_ref())
            .await
            .context("Seeding bundled defaults failed")?;
        info!("Seeded {} default records", written);
    }
    Ok(store)
}

/// Builds the strategy client when an API key is configured.
pub fn strategy_client(config: &Config) -> Result<Option<StrategyClient>> {
    let Some(key) = config.ai_api_key() else {
        info!("No AI API key configured: the strategy helper is disabled");
        return Ok(None);
    };
    let base_url = config.ai_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    let model = config.ai_model.as_deref().unwrap_or(DEFAULT_MODEL);
    let client = StrategyClient::new(base_url, key, model).context("Invalid AI base URL")?;
    info!(model, "Strategy helper enabled");
    Ok(Some(client))
}
