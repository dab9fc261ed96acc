//! In-memory [`ContentStore`].
//!
//! Used when the server runs without a database URL and by the test suite.
//! Records keep insertion order; replacing a record keeps its position.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ContentStore, StoreError};
use crate::content::{ensure_id, record_id, Collection};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .cloned())
    }

    async fn upsert(&self, collection: Collection, mut record: Value) -> Result<Value, StoreError> {
        let id = ensure_id(&mut record)?;
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection).or_default();

        match records.iter_mut().find(|r| record_id(r) == Some(id.as_str())) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        Ok(records.len() < before)
    }
}
