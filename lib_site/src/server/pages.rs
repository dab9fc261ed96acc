//! HTML pages: the built shell with per-page meta tags.

use axum::{
    extract::State,
    http::Uri,
    response::{Html, IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, warn};

use super::{AppError, AppState};
use crate::connections::{ContentStore, StoreError};
use crate::content::{Collection, SeoEntry, SiteSettings, SETTINGS_ID};
use crate::seo::{find_subject, inject, resolve, PageRequest, PageRoute, SeoContext};

/// Fallback handler for every path that is neither an API route nor a file.
pub async fn render_page(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path();

    // 1. Unknown API paths answer in JSON, never with the shell
    if path == "/api" || path.starts_with("/api/") {
        return AppError::NotFound(format!("No API route for {}", path)).into_response();
    }

    // 2. The shell is required
    let shell_path = state.options.dist_dir.join("index.html");
    let shell = match tokio::fs::read_to_string(&shell_path).await {
        Ok(html) => html,
        Err(e) => {
            return AppError::ShellMissing(format!("{}: {}", shell_path.display(), e)).into_response()
        }
    };

    // 3. SEO data is best effort
    let request = PageRequest::parse(path);
    let context = match load_context(state.store.as_ref(), &request).await {
        Ok(mut context) => {
            context.site_url = state.options.site_url.clone();
            context
        }
        Err(e) => {
            warn!(path = %request.path, error = %e, "SEO data unavailable, using defaults");
            SeoContext {
                site_url: state.options.site_url.clone(),
                ..SeoContext::default()
            }
        }
    };

    let meta = resolve(&request, &context);
    debug!(path = %request.path, title = %meta.title, "Rendering page");
    Html(inject(&shell, &meta)).into_response()
}

/// Loads the overrides, the settings and, for detail routes, the entity.
///
/// Individual malformed records are skipped; only store failures are errors.
pub async fn load_context(
    store: &dyn ContentStore,
    request: &PageRequest,
) -> Result<SeoContext, StoreError> {
    let overrides = store
        .list(Collection::Seo)
        .await?
        .into_iter()
        .filter_map(|record| serde_json::from_value::<SeoEntry>(record).ok())
        .collect();

    let settings = store
        .get(Collection::Settings, SETTINGS_ID)
        .await?
        .and_then(typed_settings);

    let subject = match &request.route {
        PageRoute::Detail(collection, key) => {
            let records = store.list(*collection).await?;
            find_subject(*collection, &records, key)
        }
        _ => None,
    };

    Ok(SeoContext {
        overrides,
        subject,
        settings,
        site_url: None,
    })
}

fn typed_settings(record: Value) -> Option<SiteSettings> {
    match serde_json::from_value(record) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!(error = %e, "Stored settings are malformed, ignoring them for SEO");
            None
        }
    }
}
