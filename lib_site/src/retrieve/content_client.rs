//! # Content Client
//!
//! The single façade the site and the admin tool use to reach the content
//! API.
//!
//! ## Caching Policy:
//! - Each collection has one cache slot and is fetched at most once per
//!   client. Concurrent loads of the same collection queue on the slot lock
//!   behind the first request instead of issuing their own.
//! - A fetch that exceeds the timeout (3.5 s by default), fails in transport
//!   or returns a non-2xx status counts as a failure. The bundled defaults are
//!   returned and nothing is cached, so the next load tries the network again.
//! - A successful empty list is cached as-is, but reads as the bundled
//!   defaults whenever those are non-empty. This can hide a collection the
//!   admin emptied on purpose.
//! - Every successful write invalidates exactly the slot of the collection it
//!   touched. Failed writes leave the cache alone.

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::ky_http::{ApiClient, ApiResponse, DEFAULT_MAX_RETRIES};
use crate::content::{
    default_records, default_settings, record_id, Collection, ContentError, Lead, SiteSettings,
};

/// How long a read may take before the defaults are served instead.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3500);
/// Upper bound for writes, which never fall back.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced by writes and typed reads.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API returned {status} for {path}: {body}")]
    Status { path: String, status: u16, body: String },

    #[error("Unexpected response shape from {0}")]
    UnexpectedShape(String),

    #[error("Failed to decode {collection} records: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Content(#[from] ContentError),
}

impl ClientError {
    /// The HTTP status for API-level failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Where a loaded value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Fetched by this call.
    Network,
    /// Served from the collection's cache slot.
    Cache,
    /// Bundled defaults substituted for a failed, slow or empty response.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub data: T,
    pub origin: Origin,
}

#[derive(Debug, Clone)]
pub struct ContentClientOptions {
    pub timeout: Duration,
    pub write_timeout: Duration,
    /// Bearer token for admin-gated routes.
    pub auth_token: Option<String>,
    pub max_retries: u32,
}

impl Default for ContentClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            auth_token: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

type Slot = Mutex<Option<Arc<Vec<Value>>>>;

/// # Content Client
///
/// Cached, fallback-aware access to every content collection.
pub struct ContentClient {
    api: ApiClient,
    options: ContentClientOptions,
    /// One slot per collection, indexed by the enum discriminant.
    slots: [Slot; Collection::ALL.len()],
}

impl ContentClient {
    /// Creates a client for the site rooted at `base_url` (e.g. "https://example.com/").
    pub fn new(base_url: &str, options: ContentClientOptions) -> Result<Self, ClientError> {
        let api = ApiClient::with_max_retries(base_url, options.auth_token.clone(), options.max_retries)
            .map_err(|e| ClientError::Transport(format!("{:#}", e)))?;
        Ok(Self {
            api,
            options,
            slots: std::array::from_fn(|_| Mutex::new(None)),
        })
    }

    fn slot(&self, collection: Collection) -> &Slot {
        &self.slots[collection as usize]
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        self.api
            .endpoint(segments)
            .map_err(|e| ClientError::Transport(format!("{:#}", e)))
    }

    async fn call(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        limit: Duration,
    ) -> Result<ApiResponse<Value>, ClientError> {
        let path = url.path().to_string();
        match timeout(limit, self.api.request_url::<Value, &Value>(method, url, None, body)).await {
            Err(_) => Err(ClientError::Timeout { path, timeout: limit }),
            Ok(Err(e)) => Err(ClientError::Transport(format!("{:#}", e))),
            Ok(Ok(response)) if !response.success => Err(ClientError::Status {
                path,
                status: response.status,
                body: response.error_body.unwrap_or_default(),
            }),
            Ok(Ok(response)) => Ok(response),
        }
    }

    /// Reads a collection straight from the API, bypassing cache and defaults.
    pub async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, ClientError> {
        let url = self.url(&["api", collection.segment()])?;
        let path = url.path().to_string();
        let response = self.call(Method::GET, url, None, self.options.timeout).await?;

        match response.data {
            Some(Value::Array(records)) => Ok(records),
            // The settings endpoint answers with the record itself.
            Some(Value::Object(record)) if collection.is_singleton() => {
                if record.is_empty() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![Value::Object(record)])
                }
            }
            None => Ok(Vec::new()),
            Some(_) => Err(ClientError::UnexpectedShape(path)),
        }
    }

    /// Loads a collection through the cache.
    ///
    /// Never fails: any problem is logged and answered with the defaults.
    pub async fn load(&self, collection: Collection) -> Loaded<Arc<Vec<Value>>> {
        let mut slot = self.slot(collection).lock().await;

        if let Some(cached) = slot.as_ref() {
            debug!(%collection, "Serving collection from cache");
            return with_defaults(collection, Arc::clone(cached), Origin::Cache);
        }

        match self.fetch_all(collection).await {
            Ok(records) => {
                let records = Arc::new(records);
                *slot = Some(Arc::clone(&records));
                with_defaults(collection, records, Origin::Network)
            }
            Err(e) => {
                warn!(%collection, error = %e, "Collection fetch failed, using bundled defaults");
                Loaded {
                    data: Arc::new(default_records(collection)),
                    origin: Origin::Fallback,
                }
            }
        }
    }

    /// Loads a collection and deserializes each record into `T`.
    pub async fn load_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Loaded<Vec<T>>, ClientError> {
        let loaded = self.load(collection).await;
        let data = loaded
            .data
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|source| ClientError::Decode { collection, source })?;
        Ok(Loaded { data, origin: loaded.origin })
    }

    /// The site settings, with the bundled settings as fallback.
    pub async fn settings(&self) -> Loaded<SiteSettings> {
        let loaded = self.load(Collection::Settings).await;
        let parsed = loaded
            .data
            .first()
            .cloned()
            .map(serde_json::from_value::<SiteSettings>);

        match parsed {
            Some(Ok(settings)) => Loaded { data: settings, origin: loaded.origin },
            Some(Err(e)) => {
                warn!(error = %e, "Stored settings are malformed, using bundled defaults");
                Loaded { data: default_settings(), origin: Origin::Fallback }
            }
            None => Loaded { data: default_settings(), origin: Origin::Fallback },
        }
    }

    /// Reads one record directly from the API, bypassing the cache.
    pub async fn fetch_one(&self, collection: Collection, id: &str) -> Result<Option<Value>, ClientError> {
        let url = self.url(&["api", collection.segment(), id])?;
        match self.call(Method::GET, url, None, self.options.timeout).await {
            Ok(response) => Ok(response.data),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Upserts a record and invalidates the collection's cache slot.
    ///
    /// Records with an id are written with `PUT /api/{collection}/{id}`, new
    /// ones with `POST /api/{collection}` so the server assigns the id.
    pub async fn save(&self, collection: Collection, record: Value) -> Result<Value, ClientError> {
        if !record.is_object() {
            return Err(ContentError::NotAnObject("a non-object value").into());
        }

        let (method, url) = if collection.is_singleton() {
            (Method::PUT, self.url(&["api", collection.segment()])?)
        } else {
            match record_id(&record).filter(|id| !id.trim().is_empty()) {
                Some(id) => (Method::PUT, self.url(&["api", collection.segment(), id])?),
                None => (Method::POST, self.url(&["api", collection.segment()])?),
            }
        };

        let path = url.path().to_string();
        let response = self
            .call(method, url, Some(&record), self.options.write_timeout)
            .await?;
        self.invalidate(collection).await;

        response.data.ok_or(ClientError::UnexpectedShape(path))
    }

    pub async fn save_settings(&self, settings: Value) -> Result<Value, ClientError> {
        self.save(Collection::Settings, settings).await
    }

    /// Deletes a record by id and invalidates the collection's cache slot.
    pub async fn delete(&self, collection: Collection, id: &str) -> Result<(), ClientError> {
        let url = self.url(&["api", collection.segment(), id])?;
        self.call(Method::DELETE, url, None, self.options.write_timeout)
            .await?;
        self.invalidate(collection).await;
        Ok(())
    }

    /// Posts a contact-form lead. The server assigns id and timestamp.
    pub async fn submit_lead(&self, lead: &Lead) -> Result<Value, ClientError> {
        let mut body = serde_json::to_value(lead).map_err(|source| ClientError::Decode {
            collection: Collection::Leads,
            source,
        })?;
        if let Some(object) = body.as_object_mut() {
            object.remove("id");
        }
        self.save(Collection::Leads, body).await
    }

    /// Drops the cached copy of one collection.
    pub async fn invalidate(&self, collection: Collection) {
        *self.slot(collection).lock().await = None;
    }

    /// Drops every cached collection.
    pub async fn clear(&self) {
        for collection in Collection::ALL {
            self.invalidate(collection).await;
        }
    }

    /// Whether a collection currently has a cached copy.
    pub async fn is_cached(&self, collection: Collection) -> bool {
        self.slot(collection).lock().await.is_some()
    }
}

/// Substitutes the defaults for an empty list when defaults exist.
fn with_defaults(collection: Collection, records: Arc<Vec<Value>>, origin: Origin) -> Loaded<Arc<Vec<Value>>> {
    if records.is_empty() {
        let defaults = default_records(collection);
        if !defaults.is_empty() {
            return Loaded {
                data: Arc::new(defaults),
                origin: Origin::Fallback,
            };
        }
    }
    Loaded { data: records, origin }
}
