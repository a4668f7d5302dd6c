//! Cosmos DB (SQL API) over its REST interface
//!
//! Requests are signed with the account master key:
//! `base64(HMAC-SHA256(key, "{verb}\n{resourceType}\n{resourceLink}\n{date}\n\n"))`,
//! sent URL-encoded in the `authorization` header together with `x-ms-date`.
//! The container is partitioned on `/id`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::Sha256;
use shared::models::Restaurant;
use url::Url;

use super::{RecordStore, StoreConnector, StoreError};
use crate::secrets::{
    COSMOS_CONTAINER, COSMOS_DATABASE, COSMOS_ENDPOINT, COSMOS_KEY, SecretResolver,
};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2018-12-31";
const LIST_ALL_QUERY: &str = "SELECT * FROM c";

/// Builds a [`CosmosStore`] from vault secrets on every connect
pub struct CosmosConnector {
    secrets: SecretResolver,
    http: reqwest::Client,
}

impl CosmosConnector {
    pub fn new(secrets: SecretResolver) -> Self {
        Self {
            secrets,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl StoreConnector for CosmosConnector {
    async fn connect(&self) -> Result<Box<dyn RecordStore>, StoreError> {
        let endpoint = self.secrets.resolve(COSMOS_ENDPOINT).await?;
        let key = self.secrets.resolve(COSMOS_KEY).await?;
        let database = self.secrets.resolve(COSMOS_DATABASE).await?;
        let container = self.secrets.resolve(COSMOS_CONTAINER).await?;

        let store = CosmosStore::new(self.http.clone(), &endpoint, &key, &database, &container)?;
        tracing::debug!(database = %database, container = %container, "Connected to Cosmos DB");
        Ok(Box::new(store))
    }
}

pub struct CosmosStore {
    http: reqwest::Client,
    endpoint: Url,
    key: Vec<u8>,
    database: String,
    container: String,
    collection_link: String,
}

#[derive(Deserialize)]
struct QueryPage {
    #[serde(rename = "Documents", default)]
    documents: Vec<Map<String, Value>>,
}

impl CosmosStore {
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        key: &str,
        database: &str,
        container: &str,
    ) -> Result<Self, StoreError> {
        let key = STANDARD
            .decode(key.trim())
            .map_err(|e| StoreError::Credentials(format!("account key is not base64: {e}")))?;
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| StoreError::Endpoint(format!("'{endpoint}': {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::Endpoint(format!("'{endpoint}' cannot hold a path")));
        }
        Ok(Self {
            http,
            endpoint,
            key,
            collection_link: format!("dbs/{database}/colls/{container}"),
            database: database.to_string(),
            container: container.to_string(),
        })
    }

    /// Resource link of a document, as signed (ids are not escaped)
    fn document_link(&self, id: &str) -> String {
        format!("{}/docs/{id}", self.collection_link)
    }

    /// Request URL of the `docs` feed, or of one document when `id` is set
    ///
    /// Every path segment is percent-encoded, so an id may safely contain
    /// `/`, `?`, `#` or `%`.
    fn docs_url(&self, id: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StoreError::Endpoint(format!("'{}' cannot hold a path", self.endpoint)))?;
            segments.pop_if_empty().extend([
                "dbs",
                self.database.as_str(),
                "colls",
                self.container.as_str(),
                "docs",
            ]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Start a signed request against `docs`
    ///
    /// `resource_link` is what gets signed; `url` is what gets requested.
    /// Create and query sign the collection but post to its `docs` feed.
    fn request(
        &self,
        method: Method,
        resource_link: &str,
        url: Url,
        partition_key: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, StoreError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let token = authorization_token(&self.key, &method, "docs", resource_link, &date)?;

        let mut builder = self
            .http
            .request(method, url)
            .header("authorization", token)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION);
        if let Some(id) = partition_key {
            builder = builder.header("x-ms-documentdb-partitionkey", partition_key_header(id));
        }
        Ok(builder)
    }

    async fn decode(response: Response) -> Result<Restaurant, StoreError> {
        let doc: Map<String, Value> = response.json().await?;
        decode_document(doc)
    }

    async fn query_page(
        &self,
        continuation: Option<&str>,
    ) -> Result<(Vec<Restaurant>, Option<String>), StoreError> {
        let mut builder = self
            .request(Method::POST, &self.collection_link, self.docs_url(None)?, None)?
            .header("x-ms-documentdb-isquery", "True")
            .header("x-ms-documentdb-query-enablecrosspartition", "True")
            .header("content-type", "application/query+json")
            .body(serde_json::json!({ "query": LIST_ALL_QUERY, "parameters": [] }).to_string());
        if let Some(token) = continuation {
            builder = builder.header("x-ms-continuation", token);
        }

        let response = check_status(builder.send().await?).await?;
        let next = response
            .headers()
            .get("x-ms-continuation")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let page: QueryPage = response.json().await?;
        Ok((decode_page(page.documents), next))
    }
}

#[async_trait]
impl RecordStore for CosmosStore {
    async fn create(&self, record: &Restaurant) -> Result<Restaurant, StoreError> {
        let response = self
            .request(Method::POST, &self.collection_link, self.docs_url(None)?, Some(&record.id))?
            .json(&record.to_document())
            .send()
            .await?;
        Self::decode(check_status(response).await?).await
    }

    async fn read(&self, id: &str) -> Result<Restaurant, StoreError> {
        let link = self.document_link(id);
        let response = self
            .request(Method::GET, &link, self.docs_url(Some(id))?, Some(id))?
            .send()
            .await?;
        Self::decode(check_status(response).await?).await
    }

    async fn replace(&self, id: &str, record: &Restaurant) -> Result<Restaurant, StoreError> {
        let link = self.document_link(id);
        let response = self
            .request(Method::PUT, &link, self.docs_url(Some(id))?, Some(id))?
            .json(&record.to_document())
            .send()
            .await?;
        Self::decode(check_status(response).await?).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let link = self.document_link(id);
        let response = self
            .request(Method::DELETE, &link, self.docs_url(Some(id))?, Some(id))?
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Restaurant>, StoreError> {
        let mut records = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let (page, next) = self.query_page(continuation.as_deref()).await?;
            records.extend(page);
            match next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        tracing::debug!(count = records.len(), "Full container scan complete");
        Ok(records)
    }
}

/// Decode a stored document, accepting flags saved as strings
fn decode_document(doc: Map<String, Value>) -> Result<Restaurant, StoreError> {
    Restaurant::from_stored(doc).map_err(|e| StoreError::Decode(e.message))
}

/// Decode a query page, skipping documents that are not restaurants
fn decode_page(documents: Vec<Map<String, Value>>) -> Vec<Restaurant> {
    documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.get("id").and_then(Value::as_str).map(str::to_string);
            match decode_document(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(id = ?id, error = %e, "Skipping undecodable document");
                    None
                }
            }
        })
        .collect()
}

/// Text the master key signs
fn string_to_sign(method: &Method, resource_type: &str, resource_link: &str, date: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n\n",
        method.as_str().to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    )
}

fn authorization_token(
    key: &[u8],
    method: &Method,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> Result<String, StoreError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StoreError::Credentials(e.to_string()))?;
    mac.update(string_to_sign(method, resource_type, resource_link, date).as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    let token = format!("type=master&ver=1.0&sig={signature}");
    Ok(url::form_urlencoded::byte_serialize(token.as_bytes()).collect())
}

fn partition_key_header(id: &str) -> String {
    Value::Array(vec![Value::String(id.to_string())]).to_string()
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::CONFLICT => StoreError::Conflict,
        other => StoreError::Request {
            status: other.as_u16(),
            body,
        },
    }
}
