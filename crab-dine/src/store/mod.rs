//! Record Store Gateway
//!
//! [`StoreConnector`] opens a [`RecordStore`] for one request; the store
//! exposes point reads and writes keyed by restaurant id plus an unfiltered
//! full scan.

mod cosmos;
mod memory;

pub use cosmos::CosmosConnector;
pub use memory::MemoryStore;

use async_trait::async_trait;
use shared::error::AppError;
use shared::models::Restaurant;
use thiserror::Error;

use crate::secrets::SecretError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Restaurant not found")]
    NotFound,
    #[error("Restaurant already exists")]
    Conflict,
    #[error("Store request failed with status {status}: {body}")]
    Request { status: u16, body: String },
    #[error("Store transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid store credentials: {0}")]
    Credentials(String),
    #[error("Invalid store endpoint: {0}")]
    Endpoint(String),
    #[error("Invalid stored document: {0}")]
    Decode(String),
    #[error(transparent)]
    Secret(#[from] SecretError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::restaurant_not_found(),
            StoreError::Conflict => AppError::conflict(e.to_string()),
            StoreError::Secret(_) | StoreError::Credentials(_) | StoreError::Endpoint(_) => {
                AppError::config(e.to_string())
            }
            other => AppError::database(other.to_string()),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record; fails with [`StoreError::Conflict`] on a duplicate id
    async fn create(&self, record: &Restaurant) -> Result<Restaurant, StoreError>;

    async fn read(&self, id: &str) -> Result<Restaurant, StoreError>;

    /// Overwrite an existing record
    async fn replace(&self, id: &str, record: &Restaurant) -> Result<Restaurant, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Every record in the container, unpaginated
    async fn list_all(&self) -> Result<Vec<Restaurant>, StoreError>;
}

/// Opens a store handle for a single invocation
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RecordStore>, StoreError>;
}
