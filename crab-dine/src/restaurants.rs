//! Restaurant CRUD against the record store
//!
//! Each operation opens its own store handle, so a connection or secret
//! failure surfaces as that operation's error like any store failure.

use serde_json::{Map, Value};
use shared::error::AppResult;
use shared::models::Restaurant;
use shared::util::record_timestamp;

use crate::store::StoreConnector;

/// Validate and insert a new restaurant
pub async fn add(store: &dyn StoreConnector, data: Map<String, Value>) -> AppResult<Restaurant> {
    let record = Restaurant::create(data, &record_timestamp())?;
    let created = store.connect().await?.create(&record).await?;
    tracing::info!(id = %created.id, name = %created.name, "Added restaurant");
    Ok(created)
}

/// Merge `patch` into an existing restaurant
pub async fn update(
    store: &dyn StoreConnector,
    id: &str,
    patch: &Map<String, Value>,
) -> AppResult<Restaurant> {
    let store = store.connect().await?;
    let existing = store.read(id).await?;
    let merged = existing.merge(patch, &record_timestamp())?;
    let saved = store.replace(id, &merged).await?;
    tracing::info!(id = %id, "Updated restaurant");
    Ok(saved)
}

pub async fn delete(store: &dyn StoreConnector, id: &str) -> AppResult<()> {
    store.connect().await?.delete(id).await?;
    tracing::info!(id = %id, "Deleted restaurant");
    Ok(())
}

pub async fn get(store: &dyn StoreConnector, id: &str) -> AppResult<Restaurant> {
    Ok(store.connect().await?.read(id).await?)
}

pub async fn list(store: &dyn StoreConnector) -> AppResult<Vec<Restaurant>> {
    let all = store.connect().await?.list_all().await?;
    tracing::debug!(count = all.len(), "Listed restaurants");
    Ok(all)
}
