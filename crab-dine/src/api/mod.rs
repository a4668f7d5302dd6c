//! HTTP routes
//!
//! - [`admin`] - restaurant CRUD, admin key required
//! - [`recommend`] - filtered recommendations, public
//! - [`health`] - liveness probe

pub mod admin;
pub mod health;
pub mod recommend;

use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use http::{HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use shared::error::ErrorBody;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Random 16-hex-digit request ids
#[derive(Clone)]
struct HexRequestId;

impl MakeRequestId for HexRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = hex::encode(rand::random::<[u8; 8]>());
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build the application router with all middleware
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(admin::router())
        .merge(recommend::router())
        .merge(health::router())
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HexRequestId,
        ))
        .with_state(state)
}

/// JSON response with an explicit status
pub(crate) fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// `{error, message, requestTime}` failure response
pub(crate) fn failure(
    status: StatusCode,
    error: impl Into<String>,
    message: impl Into<String>,
) -> Response {
    (status, Json(ErrorBody::new(error, message))).into_response()
}
