use async_trait::async_trait;
use shared::models::Restaurant;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{RecordStore, StoreConnector, StoreError};

/// Process-local store
///
/// Keeps insertion order so a full scan returns records the way they were
/// added. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Vec<Restaurant>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_records(records: Vec<Restaurant>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    #[cfg(test)]
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: &Restaurant) -> Result<Restaurant, StoreError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Conflict);
        }
        records.push(record.clone());
        Ok(record.clone())
    }

    async fn read(&self, id: &str) -> Result<Restaurant, StoreError> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn replace(&self, id: &str, record: &Restaurant) -> Result<Restaurant, StoreError> {
        let mut records = self.records.write().await;
        let slot = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        *slot = record.clone();
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        records.remove(index);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Restaurant>, StoreError> {
        Ok(self.records.read().await.clone())
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn RecordStore>, StoreError> {
        Ok(Box::new(self.clone()))
    }
}
