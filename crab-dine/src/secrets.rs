//! Secret resolution with a process-lifetime cache
//!
//! Secrets are looked up in AWS Secrets Manager first. A vault hit is cached
//! until the process exits; a vault failure falls back to an environment
//! variable of the same name, which is re-read on every miss.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const COSMOS_ENDPOINT: &str = "cosmos-endpoint";
pub const COSMOS_KEY: &str = "cosmos-key";
pub const COSMOS_DATABASE: &str = "CosmosDataBase";
pub const COSMOS_CONTAINER: &str = "CosmosContainer";
pub const ADMIN_API_KEY: &str = "admin-api-key";
pub const BLOB_CONNECTION: &str = "BlobStorageConnStr";
pub const BLOB_CONTAINER: &str = "BlobContainerName";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret '{name}' is unavailable: vault lookup failed ({reason}) and no environment fallback is set")]
    Missing { name: String, reason: String },
}

/// A secret vault
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<String, BoxError>;
}

/// AWS Secrets Manager backed vault
pub struct SecretsManagerSource {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerSource {
    /// Build a client from the shared SDK config, honouring an endpoint override
    pub fn new(sdk_config: &aws_config::SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_secretsmanager::config::Builder::from(sdk_config);
        if let Some(url) = endpoint {
            builder = builder.endpoint_url(url);
        }
        Self {
            client: aws_sdk_secretsmanager::Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    async fn fetch(&self, name: &str) -> Result<String, BoxError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| e.into_service_error())?;
        let value = output.secret_string().ok_or("Secret has no string value")?;
        Ok(value.to_string())
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Cached secret lookup shared by every handler
///
/// Clones share one cache. Concurrent first lookups of the same name may
/// both reach the vault; the later write simply overwrites with the same
/// value.
#[derive(Clone)]
pub struct SecretResolver {
    source: Arc<dyn SecretSource>,
    env: EnvLookup,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl SecretResolver {
    pub fn new(source: Arc<dyn SecretSource>) -> Self {
        Self {
            source,
            env: Arc::new(|name: &str| std::env::var(name).ok()),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replace the environment lookup used on vault failure
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env = Arc::new(lookup);
        self
    }

    pub async fn resolve(&self, name: &str) -> Result<String, SecretError> {
        if let Some(value) = self.cache.read().await.get(name) {
            return Ok(value.clone());
        }

        match self.source.fetch(name).await {
            Ok(value) => {
                tracing::debug!(secret = name, "Secret loaded from vault");
                self.cache
                    .write()
                    .await
                    .insert(name.to_string(), value.clone());
                Ok(value)
            }
            Err(err) => match (self.env)(name).filter(|v| !v.is_empty()) {
                Some(value) => {
                    tracing::warn!(secret = name, error = %err, "Vault lookup failed, using environment fallback");
                    Ok(value)
                }
                None => {
                    tracing::error!(secret = name, error = %err, "Secret unavailable");
                    Err(SecretError::Missing {
                        name: name.to_string(),
                        reason: err.to_string(),
                    })
                }
            },
        }
    }
}
