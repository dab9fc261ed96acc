//! # Agency Site Server
//!
//! Serves the content API, the SEO-injected HTML shell and the built front
//! end from one process.
//!
//! Configuration is layered: built-in defaults, then `server_site.conf`
//! (JSON, path overridable with `--config-path`), then environment variables
//! (a `.env` file is loaded first), then command-line flags.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use lib_site::loggers::setup_logging;
use lib_site::server::{serve, shutdown_signal, AppState};

mod site_logic;
use site_logic::config::{self, FileLayer};
use site_logic::store;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Environment, configuration and logging
    dotenvy::dotenv().ok();
    let (config, file_layer) = config::load_config();
    let _guard = setup_logging(&config.log_dir(), config.log_level(), "server_site")?;

    match &file_layer {
        FileLayer::Loaded(path) => info!("Configuration file loaded: {}", path.display()),
        FileLayer::Missing(path) => info!(
            "Config file not found at {}. Using defaults and environment/CLI values.",
            path.display()
        ),
        FileLayer::Invalid(path, e) => warn!(
            "Failed to parse config file {}: {}. Falling back to other sources.",
            path.display(),
            e
        ),
    }

    // 2. Storage and the optional strategy helper
    let content_store = store::open_store(&config).await?;
    let strategy = store::strategy_client(&config)?;
    let state = AppState::new(content_store, strategy, config.site_options());

    // 3. Bind and serve until Ctrl-C / SIGTERM
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;
    serve(listener, state, shutdown_signal()).await?;

    info!("Shutdown complete.");
    Ok(())
}
