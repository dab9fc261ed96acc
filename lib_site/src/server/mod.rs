//! # Site Server
//!
//! The axum application behind the agency website.
//!
//! ## Routes
//!
//! - `GET /api/health`: store liveness.
//! - `GET|PUT /api/settings`: the single site-settings record.
//! - `POST /api/strategy`: the AI marketing-strategy helper.
//! - `GET|POST /api/{collection}` and `GET|PUT|DELETE /api/{collection}/{id}`:
//!   generic CRUD over every content collection.
//! - Anything else: a file from the built front end, or the HTML shell with
//!   its meta tags rewritten for the requested page.
//!
//! ## Admin gate
//!
//! When an admin token is configured, writes (other than public lead
//! submission and the strategy helper) and every read of leads require
//! `Authorization: Bearer <token>`.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::connections::ContentStore;
use crate::strategy::StrategyClient;

pub mod error;
pub mod pages;
pub mod routes;

pub use error::AppError;

/// Request bodies above this size are rejected unless configured otherwise.
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// # Site Options
///
/// Server settings that handlers consult per request.
#[derive(Debug, Clone)]
pub struct SiteOptions {
    /// Directory holding the built front end and its `index.html` shell.
    pub dist_dir: PathBuf,
    /// Bearer token guarding admin routes; `None` leaves them open.
    pub admin_token: Option<String>,
    /// Allowed CORS origin; `None` allows any.
    pub cors_origin: Option<String>,
    /// Public site URL used for absolute meta links when settings have none.
    pub site_url: Option<String>,
    pub body_limit: usize,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            dist_dir: PathBuf::from("dist"),
            admin_token: None,
            cors_origin: None,
            site_url: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub strategy: Option<Arc<StrategyClient>>,
    pub options: Arc<SiteOptions>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ContentStore>,
        strategy: Option<StrategyClient>,
        options: SiteOptions,
    ) -> Self {
        Self {
            store,
            strategy: strategy.map(Arc::new),
            options: Arc::new(options),
        }
    }
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer.allow_origin(AllowOrigin::exact(value)),
        Some(Err(_)) => {
            warn!("CORS origin is not a valid header value, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

/// # Build Router
///
/// Wires the API routes, the static file service and the SEO page fallback
/// around one shared [`AppState`].
pub fn build_router(state: AppState) -> Router {
    if state.options.admin_token.is_none() {
        warn!("No admin token configured: admin API routes are open");
    }

    // 1. Unmatched paths try the built front end, then the SEO-injected shell
    let pages = get(pages::render_page).with_state(state.clone());
    let static_files = ServeDir::new(&state.options.dist_dir)
        .append_index_html_on_directories(false)
        .fallback(pages);

    // 2. API routes; static segments take precedence over `{collection}`
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/settings", get(routes::get_settings).put(routes::put_settings))
        .route("/api/strategy", post(routes::strategy))
        // The shell itself is a page, not a static file
        .route("/index.html", get(pages::render_page))
        .route(
            "/api/{collection}",
            get(routes::list_records).post(routes::create_record),
        )
        .route(
            "/api/{collection}/{id}",
            get(routes::get_record)
                .put(routes::put_record)
                .delete(routes::delete_record),
        )
        .fallback_service(static_files)
        // 3. Cross-cutting layers
        .layer(DefaultBodyLimit::max(state.options.body_limit))
        .layer(cors_layer(state.options.cors_origin.as_deref()))
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    if let Ok(addr) = listener.local_addr() {
        info!("Site server listening on http://{}", addr);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
