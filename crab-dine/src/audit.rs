//! Best-effort request audit log
//!
//! Every `/admin` and `/recommend` request is written as one JSON object.
//! Sink failures are logged and swallowed by [`record`]; they never change
//! the response.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::request::IncomingRequest;
use crate::secrets::{BLOB_CONNECTION, BLOB_CONTAINER, SecretError, SecretResolver};

/// Bucket used when `BlobContainerName` is empty
pub const DEFAULT_CONTAINER: &str = "function-logs";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error("Invalid storage connection string: {0}")]
    ConnectionString(String),
    #[error("Failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to upload audit record: {0}")]
    Upload(String),
}

/// Request metadata as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    /// UTC, `%Y-%m-%dT%H:%M:%SZ`
    pub timestamp: String,
    pub method: String,
    pub url: String,
    pub query_params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl RequestLog {
    pub fn capture(req: &IncomingRequest) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            method: req.method().to_string(),
            url: req.url().to_string(),
            query_params: req.query_params().clone(),
            headers: req.headers().clone(),
        }
    }

    /// Drop the named query parameters and headers (case-insensitive)
    pub fn without(mut self, query_keys: &[&str], header_keys: &[&str]) -> Self {
        self.query_params
            .retain(|name, _| !query_keys.iter().any(|k| name.eq_ignore_ascii_case(k)));
        self.headers
            .retain(|name, _| !header_keys.iter().any(|k| name.eq_ignore_ascii_case(k)));
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(&self, entry: &RequestLog) -> Result<(), AuditError>;
}

/// Write an audit record, never failing the caller
pub async fn record(sink: &dyn AuditSink, entry: RequestLog) {
    if let Err(e) = sink.log(&entry).await {
        tracing::error!(error = %e, method = %entry.method, "Error logging request to audit sink");
    }
}

/// `{UTC %Y%m%dT%H%M%SZ}_{8 random hex}.json`
pub fn object_name(now: DateTime<Utc>) -> String {
    let suffix: [u8; 4] = rand::random();
    format!("{}_{}.json", now.format("%Y%m%dT%H%M%SZ"), hex::encode(suffix))
}

/// Parsed `BlobStorageConnStr`
///
/// Either a bare endpoint URL or `;`-separated `Key=Value` pairs. Recognised
/// keys (case-insensitive): `Endpoint`, `BlobEndpoint`, `Region`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageTarget {
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl StorageTarget {
    pub fn parse(conn: &str) -> Result<Self, AuditError> {
        let conn = conn.trim();
        if conn.is_empty() {
            return Err(AuditError::ConnectionString("empty".into()));
        }
        if conn.starts_with("http://") || conn.starts_with("https://") {
            return Ok(Self {
                endpoint: Some(validate_endpoint(conn)?),
                region: None,
            });
        }

        let mut target = Self::default();
        for part in conn.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| AuditError::ConnectionString(format!("'{part}' is not Key=Value")))?;
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" | "blobendpoint" => {
                    target.endpoint = Some(validate_endpoint(value.trim())?)
                }
                "region" => target.region = Some(value.trim().to_string()),
                _ => {}
            }
        }
        Ok(target)
    }
}

fn validate_endpoint(raw: &str) -> Result<String, AuditError> {
    url::Url::parse(raw)
        .map_err(|e| AuditError::ConnectionString(format!("bad endpoint '{raw}': {e}")))?;
    Ok(raw.trim_end_matches('/').to_string())
}

/// Uploads audit records to S3
pub struct S3AuditSink {
    secrets: SecretResolver,
    sdk_config: aws_config::SdkConfig,
}

impl S3AuditSink {
    pub fn new(secrets: SecretResolver, sdk_config: aws_config::SdkConfig) -> Self {
        Self {
            secrets,
            sdk_config,
        }
    }

    fn client(&self, target: &StorageTarget) -> aws_sdk_s3::Client {
        let mut builder = aws_sdk_s3::config::Builder::from(&self.sdk_config);
        if let Some(endpoint) = &target.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        if let Some(region) = &target.region {
            builder = builder.region(aws_sdk_s3::config::Region::new(region.clone()));
        }
        aws_sdk_s3::Client::from_conf(builder.build())
    }
}

#[async_trait]
impl AuditSink for S3AuditSink {
    async fn log(&self, entry: &RequestLog) -> Result<(), AuditError> {
        let conn = self.secrets.resolve(BLOB_CONNECTION).await?;
        let bucket = self.secrets.resolve(BLOB_CONTAINER).await?;
        let bucket = if bucket.trim().is_empty() {
            DEFAULT_CONTAINER.to_string()
        } else {
            bucket
        };

        let client = self.client(&StorageTarget::parse(&conn)?);

        // Usually fails because the bucket already exists
        if let Err(e) = client.create_bucket().bucket(&bucket).send().await {
            tracing::debug!(bucket = %bucket, error = %e, "create_bucket skipped");
        }

        let key = object_name(Utc::now());
        let body = serde_json::to_vec_pretty(entry)?;
        client
            .put_object()
            .bucket(&bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AuditError::Upload(e.to_string()))?;

        tracing::info!(bucket = %bucket, key = %key, "Logged request to blob storage");
        Ok(())
    }
}

/// Writes audit records to the tracing log
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log(&self, entry: &RequestLog) -> Result<(), AuditError> {
        let json = serde_json::to_string(entry)?;
        tracing::info!(target: "crab_dine::audit", record = %json, "Request audit");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingAudit, RecordingAudit, StaticSecrets};
    use chrono::TimeZone;
    use http::{HeaderMap, HeaderValue, Method, Uri};
    use std::sync::Arc;

    fn sample_request() -> IncomingRequest {
        let uri: Uri = "/admin?action=list&admin_key=hunter2".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("localhost"));
        headers.insert("x-admin-key", HeaderValue::from_static("hunter2"));
        headers.insert("authorization", HeaderValue::from_static("Bearer hunter2"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8"));
        IncomingRequest::from_parts(Method::GET, &uri, &headers, b"")
    }

    #[test]
    fn capture_copies_request_metadata() {
        let log = RequestLog::capture(&sample_request());
        assert_eq!(log.method, "GET");
        assert_eq!(log.url, "http://localhost/admin?action=list&admin_key=hunter2");
        assert_eq!(log.query_params.get("action").map(String::as_str), Some("list"));
        assert_eq!(log.headers.get("user-agent").map(String::as_str), Some("curl/8"));
        assert!(log.timestamp.ends_with('Z'));
        assert_eq!(log.timestamp.len(), 20);
    }

    #[test]
    fn without_removes_credentials() {
        let log = RequestLog::capture(&sample_request())
            .without(&["admin_key"], &["X-Admin-Key", "authorization"]);
        assert!(!log.query_params.contains_key("admin_key"));
        assert!(!log.headers.contains_key("x-admin-key"));
        assert!(!log.headers.contains_key("authorization"));
        assert!(log.headers.contains_key("user-agent"));
    }

    #[test]
    fn object_names_are_timestamped_and_unique() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();
        let a = object_name(now);
        let b = object_name(now);
        assert!(a.starts_with("20240501T130405Z_"));
        assert!(a.ends_with(".json"));
        assert_eq!(a.len(), "20240501T130405Z_".len() + 8 + ".json".len());
        let suffix = &a[17..25];
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn parse_bare_url() {
        let target = StorageTarget::parse("http://localhost:4566/").unwrap();
        assert_eq!(target.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(target.region, None);
    }

    #[test]
    fn parse_key_value_pairs() {
        let target = StorageTarget::parse(
            "DefaultEndpointsProtocol=https;BlobEndpoint=https://s3.eu-west-1.amazonaws.com;Region=eu-west-1;",
        )
        .unwrap();
        assert_eq!(
            target.endpoint.as_deref(),
            Some("https://s3.eu-west-1.amazonaws.com")
        );
        assert_eq!(target.region.as_deref(), Some("eu-west-1"));

        let target = StorageTarget::parse("region=us-east-2").unwrap();
        assert_eq!(target.endpoint, None);
        assert_eq!(target.region.as_deref(), Some("us-east-2"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(StorageTarget::parse("").is_err());
        assert!(StorageTarget::parse("just-some-text").is_err());
        assert!(StorageTarget::parse("Endpoint=not a url").is_err());
    }

    #[tokio::test]
    async fn record_swallows_sink_errors() {
        let entry = RequestLog::capture(&sample_request());
        record(&FailingAudit, entry.clone()).await;

        let sink = RecordingAudit::default();
        record(&sink, entry.clone()).await;
        assert_eq!(sink.entries(), vec![entry]);
    }

    #[tokio::test]
    async fn s3_sink_fails_cleanly_without_connection_string() {
        let vault = Arc::new(StaticSecrets::new::<&str, &str>([]));
        let secrets = SecretResolver::new(vault).with_env_lookup(|_| None);
        let sdk_config = aws_config::SdkConfig::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .build();
        let sink = S3AuditSink::new(secrets, sdk_config);

        let err = sink
            .log(&RequestLog::capture(&sample_request()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Secret(_)));
    }

    #[tokio::test]
    async fn tracing_sink_accepts_everything() {
        let entry = RequestLog::capture(&sample_request());
        assert!(TracingAuditSink.log(&entry).await.is_ok());
    }
}
