//! # Integration Test Harness
//!
//! Serves the real site router on an ephemeral port, backed by a
//! [`MemoryStore`] and a temporary front-end build, so tests can drive it
//! over HTTP exactly as the browser and the admin tool do.

#![forbid(unsafe_code)]

use axum::Router;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use lib_site::connections::{ContentStore, MemoryStore};
use lib_site::server::{build_router, AppState, SiteOptions};
use lib_site::strategy::StrategyClient;
use lib_site::{ContentClient, ContentClientOptions};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// The HTML shell a front-end build would produce.
pub const SHELL: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <title>Vite App</title>
    <meta name="description" content="placeholder" />
  </head>
  <body><div id="root"></div></body>
</html>
"#;

/// A running site plus handles to inspect it.
pub struct TestSite {
    /// Base URL with a trailing slash, e.g. `http://127.0.0.1:40123/`.
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub dist: TempDir,
    handle: JoinHandle<()>,
}

impl TestSite {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// A content client without an admin token, as the public site uses.
    pub fn public_client(&self) -> ContentClient {
        self.client(None)
    }

    pub fn admin_client(&self) -> ContentClient {
        self.client(Some(ADMIN_TOKEN))
    }

    fn client(&self, token: Option<&str>) -> ContentClient {
        let options = ContentClientOptions {
            auth_token: token.map(str::to_string),
            max_retries: 0,
            ..ContentClientOptions::default()
        };
        ContentClient::new(&self.base_url, options).expect("valid base url")
    }
}

impl Drop for TestSite {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serves any router on an ephemeral local port and returns its base URL.
pub async fn serve_router(router: Router) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    (format!("http://{}/", addr), handle)
}

/// Starts the site with the admin token set and no strategy helper.
pub async fn spawn_site() -> TestSite {
    spawn_site_with(None, |_| {}).await
}

/// Starts the site; `configure` may adjust the options before serving.
pub async fn spawn_site_with(
    strategy: Option<StrategyClient>,
    configure: impl FnOnce(&mut SiteOptions),
) -> TestSite {
    let dist = tempfile::tempdir().expect("temp dist dir");
    std::fs::write(dist.path().join("index.html"), SHELL).expect("write shell");
    std::fs::create_dir_all(dist.path().join("assets")).expect("assets dir");
    std::fs::write(dist.path().join("assets/app.js"), "console.log('app');").expect("write asset");

    let mut options = SiteOptions {
        dist_dir: dist.path().to_path_buf(),
        admin_token: Some(ADMIN_TOKEN.to_string()),
        site_url: Some("https://agency.example".to_string()),
        ..SiteOptions::default()
    };
    configure(&mut options);

    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn ContentStore> = store.clone();
    let state = AppState::new(shared, strategy, options);

    let (base_url, handle) = serve_router(build_router(state)).await;
    TestSite {
        base_url,
        store,
        dist,
        handle,
    }
}

/// A local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}/", addr)
}
