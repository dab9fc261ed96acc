//! # Connections Module
//!
//! Server-side persistence for content collections. Every collection is a
//! table of JSON blobs keyed by record id; there is no cross-table
//! transaction and no conflict detection between concurrent admin edits.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::content::{default_records, Collection, ContentError};

/// MySQL connection pool and the JSON-blob table layout.
pub mod db_mysql;
/// Process-local store for development and tests.
pub mod memory;

pub use db_mysql::Database;
pub use memory::MemoryStore;

/// Errors raised by a [`ContentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Query execution failed: {0}")]
    QueryError(String),

    #[error("Stored record {collection}/{id} is not valid JSON: {source}")]
    CorruptRecord {
        collection: Collection,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// # Content Store
///
/// Generic CRUD over the content collections. Implementations must treat
/// `upsert` as insert-or-replace keyed by the record id and assign an id
/// when the record has none.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short label for logs and the health endpoint.
    fn kind(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    /// All records of a collection, oldest first.
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    /// Inserts or replaces the record and returns it as stored.
    async fn upsert(&self, collection: Collection, record: Value) -> Result<Value, StoreError>;

    /// Removes a record; `false` when no record had that id.
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;
}

/// Writes the bundled defaults into every collection that is still empty.
///
/// Returns the number of records written.
pub async fn seed_defaults(store: &dyn ContentStore) -> Result<usize, StoreError> {
    let mut written = 0;
    for collection in Collection::ALL {
        let defaults = default_records(collection);
        if defaults.is_empty() || !store.list(collection).await?.is_empty() {
            continue;
        }
        for record in defaults {
            store.upsert(collection, record).await?;
            written += 1;
        }
        info!(%collection, "Seeded collection with bundled defaults");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn seeding_skips_collections_that_already_hold_data() {
        let store = MemoryStore::new();
        store
            .upsert(Collection::Services, json!({"id": "custom", "title": "Custom"}))
            .await
            .unwrap();

        let written = seed_defaults(&store).await.unwrap();

        let services = store.list(Collection::Services).await.unwrap();
        assert_eq!(services.len(), 1);
        assert!(!store.list(Collection::Cases).await.unwrap().is_empty());
        assert_eq!(
            store.get(Collection::Settings, "global").await.unwrap().unwrap()["siteName"],
            json!("Brightpath Marketing")
        );
        assert!(store.list(Collection::Leads).await.unwrap().is_empty());

        // A second pass finds nothing left to do.
        assert!(written > 0);
        assert_eq!(seed_defaults(&store).await.unwrap(), 0);
    }
}
