//! # lib_site
//!
//! Shared library behind the agency website backend and its admin tool.
//!
//! Every top-level module sits behind a cargo feature of the same name so the
//! admin CLI only pulls in the HTTP client while the server enables `full`.
//!
//! - **`content`**: collections, typed record views, bundled fallback data.
//! - **`connections`**: MySQL JSON-blob tables and the in-memory store.
//! - **`retrieve`**: retrying HTTP client and the cached content façade.
//! - **`seo`**: per-request meta-tag resolution and HTML head rewriting.
//! - **`strategy`**: generative-text client for the marketing-strategy widget.
//! - **`server`**: the axum router tying the pieces together.
//! - **`loggers`**: tracing subscriber setup with rotating log files.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

#[cfg(feature = "content")]
pub mod content;

#[cfg(feature = "connections")]
pub mod connections;

#[cfg(feature = "loggers")]
pub mod loggers;

#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(feature = "seo")]
pub mod seo;

#[cfg(feature = "strategy")]
pub mod strategy;

#[cfg(feature = "server")]
pub mod server;

// Re-export the types most callers reach for.
#[cfg(feature = "content")]
pub use content::{Collection, ContentError};
#[cfg(feature = "retrieve")]
pub use retrieve::content_client::{ContentClient, ContentClientOptions, Loaded, Origin};
