use shared::models::Restaurant;
use std::path::Path;
use std::sync::Arc;

use crate::audit::{AuditSink, S3AuditSink, TracingAuditSink};
use crate::config::{AuditBackend, Config, StoreBackend};
use crate::secrets::{SecretResolver, SecretsManagerSource};
use crate::store::{CosmosConnector, MemoryStore, StoreConnector};

/// Shared application state
pub struct AppState {
    /// Cached secret lookup (admin key, store and audit credentials)
    pub secrets: SecretResolver,
    /// Opens a record store per request
    pub store: Arc<dyn StoreConnector>,
    /// Request audit sink
    pub audit: Arc<dyn AuditSink>,
    /// Served by /recommend when the store is unavailable
    pub fallback: Arc<Vec<Restaurant>>,
}

impl AppState {
    pub async fn new(config: &Config) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let vault = SecretsManagerSource::new(&aws_config, config.key_vault_url.as_deref());
        let secrets = SecretResolver::new(Arc::new(vault));

        let store: Arc<dyn StoreConnector> = match config.record_store {
            StoreBackend::Cosmos => Arc::new(CosmosConnector::new(secrets.clone())),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };

        let audit: Arc<dyn AuditSink> = match config.audit_sink {
            AuditBackend::S3 => Arc::new(S3AuditSink::new(secrets.clone(), aws_config.clone())),
            AuditBackend::Log => Arc::new(TracingAuditSink),
        };

        let fallback = load_fallback(config.fallback_path.as_deref()).await;

        Self {
            secrets,
            store,
            audit,
            fallback: Arc::new(fallback),
        }
    }
}

/// Load the static fallback list; any problem yields an empty list
pub async fn load_fallback(path: Option<&Path>) -> Vec<Restaurant> {
    let Some(path) = path else {
        return Vec::new();
    };

    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Fallback list unreadable, using empty list");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<Restaurant>>(&raw) {
        Ok(list) => {
            tracing::info!(path = %path.display(), count = list.len(), "Loaded fallback restaurants");
            list
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Fallback list malformed, using empty list");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn no_path_means_empty() {
        assert!(load_fallback(None).await.is_empty());
    }

    #[tokio::test]
    async fn missing_or_malformed_file_means_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_fallback(Some(&dir.path().join("absent.json"))).await.is_empty());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(load_fallback(Some(file.path())).await.is_empty());
    }

    #[tokio::test]
    async fn loads_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"id":"f1","name":"Standby","style":"Diner","openHour":"00:00","closeHour":"23:59","priceRange":"$","deliveries":false}]"#,
        )
        .unwrap();

        let list = load_fallback(Some(file.path())).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "f1");
        assert_eq!(list[0].deliveries, Some(false));
    }
}
