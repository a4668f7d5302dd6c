//! Framework-neutral view of an inbound HTTP request
//!
//! Handlers read method, headers, query parameters and the JSON body through
//! [`IncomingRequest`] instead of poking at axum types directly.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, Method, Uri};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct IncomingRequest {
    method: Method,
    url: String,
    /// Header names lower-cased
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    body: Option<Value>,
}

impl IncomingRequest {
    /// Build from raw request pieces
    ///
    /// A body that is empty or not valid JSON is treated as absent. Repeated
    /// query keys keep the last value.
    pub fn from_parts(method: Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Self {
        let header_map: BTreeMap<String, String> = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let query = url::form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

        let body = if body.is_empty() {
            None
        } else {
            serde_json::from_slice(body).ok()
        };

        Self {
            url: absolute_url(uri, &header_map),
            method,
            headers: header_map,
            query,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Parsed JSON body, if any
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Field of a JSON object body
    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.as_ref()?.as_object()?.get(name)
    }
}

impl<S> FromRequest<S> for IncomingRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let headers = req.headers().clone();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self::from_parts(method, &uri, &headers, &body))
    }
}

fn absolute_url(uri: &Uri, headers: &BTreeMap<String, String>) -> String {
    if uri.scheme().is_some() {
        return uri.to_string();
    }
    match headers.get("host") {
        Some(host) => {
            let scheme = headers
                .get("x-forwarded-proto")
                .map(String::as_str)
                .unwrap_or("http");
            format!("{scheme}://{host}{uri}")
        }
        None => uri.to_string(),
    }
}
