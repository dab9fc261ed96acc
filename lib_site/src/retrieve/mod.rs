//! # Data Retrieval Module
//!
//! Client-side data access for the site and its admin tool.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, featuring automatic retries with exponential
//!   backoff.
//! - **`content_client`**: The content façade. It fetches each collection
//!   once, caches it per collection, substitutes the bundled defaults when
//!   the API is slow, failing or empty, and invalidates a collection's slot
//!   after every write to it.

#![forbid(unsafe_code)]

/// Generic HTTP API client with retry middleware for resilient network requests.
pub mod ky_http;
/// Cached, fallback-aware access to the content collections.
pub mod content_client;
