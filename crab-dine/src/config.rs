use std::path::PathBuf;

/// Set by the Lambda runtime in every function process
const LAMBDA_RUNTIME_VAR: &str = "AWS_LAMBDA_RUNTIME_API";

/// Whether this process was started by the Lambda runtime
///
/// Read on its own so logging can be set up before [`Config::from_env`]
/// reports anything.
pub fn on_lambda() -> bool {
    std::env::var(LAMBDA_RUNTIME_VAR).is_ok_and(|v| !v.trim().is_empty())
}

/// Where restaurant records live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Cosmos DB SQL API, credentials resolved through the secret vault
    Cosmos,
    /// Process-local store (local runs, tests)
    Memory,
}

/// Where request audit records go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditBackend {
    /// One JSON object per request in an S3 bucket
    S3,
    /// The tracing log only
    Log,
}

/// crab-dine configuration, read from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets Manager endpoint override (KEY_VAULT_URL)
    pub key_vault_url: Option<String>,
    /// Record store backend (RECORD_STORE)
    pub record_store: StoreBackend,
    /// Audit sink backend (AUDIT_SINK)
    pub audit_sink: AuditBackend,
    /// Static restaurant list served when the store is unreachable
    pub fallback_path: Option<PathBuf>,
    /// Local server port
    pub port: u16,
    /// Running inside the Lambda runtime
    pub on_lambda: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let record_store = match non_empty("RECORD_STORE").as_deref().map(str::to_lowercase) {
            None => StoreBackend::Cosmos,
            Some(v) if v == "cosmos" => StoreBackend::Cosmos,
            Some(v) if v == "memory" => StoreBackend::Memory,
            Some(other) => {
                tracing::warn!(value = %other, "Unknown RECORD_STORE, using cosmos");
                StoreBackend::Cosmos
            }
        };

        let audit_sink = match non_empty("AUDIT_SINK").as_deref().map(str::to_lowercase) {
            None => AuditBackend::S3,
            Some(v) if v == "s3" => AuditBackend::S3,
            Some(v) if v == "log" => AuditBackend::Log,
            Some(other) => {
                tracing::warn!(value = %other, "Unknown AUDIT_SINK, using s3");
                AuditBackend::S3
            }
        };

        Self {
            key_vault_url: non_empty("KEY_VAULT_URL"),
            record_store,
            audit_sink,
            fallback_path: non_empty("FALLBACK_RESTAURANTS_PATH").map(PathBuf::from),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(7071),
            on_lambda: non_empty(LAMBDA_RUNTIME_VAR).is_some(),
        }
    }
}
