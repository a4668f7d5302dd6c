//! Admin API
//!
//! One endpoint, several operations, selected by `action` (query string on
//! GET, JSON body otherwise). Every request is audited with credentials
//! stripped, then authenticated, then dispatched.

use axum::extract::State;
use axum::response::Response;
use axum::{Router, routing::get};
use hmac::{Hmac, Mac};
use http::{Method, StatusCode};
use serde_json::{Map, Value, json};
use sha2::Sha256;
use shared::error::{AppError, ErrorCode};
use shared::util::request_time;
use std::sync::Arc;

use super::{failure, reply};
use crate::audit::{self, RequestLog};
use crate::request::IncomingRequest;
use crate::restaurants;
use crate::secrets::{ADMIN_API_KEY, SecretResolver};
use crate::state::AppState;

const KEY_HEADER: &str = "x-admin-key";
const KEY_PARAM: &str = "admin_key";

type HmacSha256 = Hmac<Sha256>;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/admin",
        get(handle).post(handle).put(handle).delete(handle),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Add,
    Update,
    Delete,
    Get,
    List,
    Unknown(String),
}

impl Action {
    /// Resolve the requested action; `get` is GET-only, mutations are
    /// non-GET only, `list` works everywhere
    fn of(req: &IncomingRequest) -> Self {
        let is_get = req.method() == Method::GET;
        let raw = if is_get {
            req.query("action").map(str::to_string)
        } else {
            req.body_field("action").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        };
        let name = raw.unwrap_or_else(|| "list".to_string()).to_lowercase();

        match (name.as_str(), is_get) {
            ("list", _) => Self::List,
            ("get", true) => Self::Get,
            ("add", false) => Self::Add,
            ("update", false) => Self::Update,
            ("delete", false) => Self::Delete,
            _ => Self::Unknown(name),
        }
    }
}

async fn handle(State(state): State<Arc<AppState>>, req: IncomingRequest) -> Response {
    let entry = RequestLog::capture(&req).without(&[KEY_PARAM], &[KEY_HEADER, "authorization"]);
    audit::record(state.audit.as_ref(), entry).await;

    if let Err(e) = authorize(&state.secrets, &req).await {
        tracing::warn!(code = %e.code, reason = %e.message, "Admin authentication failed");
        return failure(
            e.http_status(),
            "Unauthorized access",
            ErrorCode::NotAuthenticated.message(),
        );
    }

    let action = Action::of(&req);
    tracing::info!(method = %req.method(), action = ?action, "Admin request");

    match action {
        Action::List => list(&state).await,
        Action::Get => get_one(&state, &req).await,
        Action::Add => add(&state, &req).await,
        Action::Update => update(&state, &req).await,
        Action::Delete => delete(&state, &req).await,
        Action::Unknown(name) => rejected(
            "Invalid action",
            AppError::with_message(
                ErrorCode::InvalidAction,
                format!("Unknown admin action: {name}"),
            ),
        ),
    }
}

/// Compare the caller's key with the vault's
///
/// The key is taken from the `x-admin-key` header, else the `admin_key`
/// query parameter, else the `admin_key` body field; empty values are
/// skipped. A vault failure denies access.
async fn authorize(secrets: &SecretResolver, req: &IncomingRequest) -> Result<(), AppError> {
    let expected = secrets.resolve(ADMIN_API_KEY).await.map_err(|e| {
        tracing::error!(error = %e, "Admin key unavailable, denying request");
        AppError::with_message(ErrorCode::NotAuthenticated, "Admin key unavailable")
    })?;

    let supplied = req
        .header(KEY_HEADER)
        .filter(|k| !k.is_empty())
        .or_else(|| req.query(KEY_PARAM).filter(|k| !k.is_empty()))
        .or_else(|| {
            req.body_field(KEY_PARAM)
                .and_then(Value::as_str)
                .filter(|k| !k.is_empty())
        })
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::NotAuthenticated, "No admin key provided")
        })?;

    if keys_match(supplied, &expected) {
        Ok(())
    } else {
        Err(AppError::new(ErrorCode::InvalidCredentials))
    }
}

/// Exact equality in constant time
///
/// Both keys are run through HMAC-SHA256 under a fixed key and the tags are
/// compared with `verify_slice`.
fn keys_match(supplied: &str, expected: &str) -> bool {
    let tag = |value: &str| {
        HmacSha256::new_from_slice(KEY_HEADER.as_bytes()).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };
    match (tag(supplied), tag(expected)) {
        (Ok(supplied), Ok(expected)) => supplied
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

async fn list(state: &AppState) -> Response {
    match restaurants::list(state.store.as_ref()).await {
        Ok(all) => reply(
            StatusCode::OK,
            json!({
                "restaurants": all,
                "count": all.len(),
                "requestTime": request_time(),
            }),
        ),
        Err(e) => rejected("Failed to list restaurants", e),
    }
}

async fn get_one(state: &AppState, req: &IncomingRequest) -> Response {
    let Some(id) = req.query("id").filter(|id| !id.is_empty()) else {
        return failure(
            StatusCode::BAD_REQUEST,
            "Missing parameter",
            "Restaurant ID is required",
        );
    };

    match restaurants::get(state.store.as_ref(), id).await {
        Ok(restaurant) => reply(
            StatusCode::OK,
            json!({ "restaurant": restaurant, "requestTime": request_time() }),
        ),
        Err(e) => rejected("Failed to get restaurant", e),
    }
}

async fn add(state: &AppState, req: &IncomingRequest) -> Response {
    let data = match restaurant_payload(req) {
        Payload::Object(data) => data,
        Payload::Missing => {
            return failure(
                StatusCode::BAD_REQUEST,
                "Missing data",
                "Restaurant data is required",
            );
        }
        Payload::NotAnObject => {
            return failure(
                StatusCode::BAD_REQUEST,
                "Failed to add restaurant",
                "Restaurant data must be a JSON object",
            );
        }
    };

    match restaurants::add(state.store.as_ref(), data).await {
        Ok(restaurant) => reply(
            StatusCode::CREATED,
            json!({
                "message": "Restaurant added successfully",
                "restaurant": restaurant,
                "requestTime": request_time(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Add restaurant rejected");
            failure(StatusCode::BAD_REQUEST, "Failed to add restaurant", e.message)
        }
    }
}

async fn update(state: &AppState, req: &IncomingRequest) -> Response {
    let (Some(id), Payload::Object(patch)) = (body_id(req), restaurant_payload(req)) else {
        return failure(
            StatusCode::BAD_REQUEST,
            "Missing data",
            "Restaurant ID and update data are required",
        );
    };

    match restaurants::update(state.store.as_ref(), id, &patch).await {
        Ok(restaurant) => reply(
            StatusCode::OK,
            json!({
                "message": "Restaurant updated successfully",
                "restaurant": restaurant,
                "requestTime": request_time(),
            }),
        ),
        Err(e) => failure(
            status_or(&e, StatusCode::BAD_REQUEST),
            "Failed to update restaurant",
            e.message,
        ),
    }
}

async fn delete(state: &AppState, req: &IncomingRequest) -> Response {
    let Some(id) = body_id(req) else {
        return failure(
            StatusCode::BAD_REQUEST,
            "Missing data",
            "Restaurant ID is required",
        );
    };

    match restaurants::delete(state.store.as_ref(), id).await {
        Ok(()) => reply(
            StatusCode::OK,
            json!({
                "message": "Restaurant deleted successfully",
                "requestTime": request_time(),
            }),
        ),
        Err(e) => failure(
            status_or(&e, StatusCode::BAD_REQUEST),
            "Failed to delete restaurant",
            e.message,
        ),
    }
}

/// Failure response with the status the error code maps to
fn rejected(error: &str, e: AppError) -> Response {
    if e.is_system() {
        tracing::error!(code = %e.code, message = %e.message, "{error}");
    } else {
        tracing::warn!(code = %e.code, message = %e.message, "{error}");
    }
    failure(e.http_status(), error, e.message)
}

/// 404 for a missing record, `otherwise` for anything else
fn status_or(e: &AppError, otherwise: StatusCode) -> StatusCode {
    if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        otherwise
    }
}

enum Payload {
    Object(Map<String, Value>),
    Missing,
    NotAnObject,
}

/// The `restaurant` body field; absent, null and `{}` all count as missing
fn restaurant_payload(req: &IncomingRequest) -> Payload {
    match req.body_field("restaurant") {
        None | Some(Value::Null) => Payload::Missing,
        Some(Value::Object(map)) if map.is_empty() => Payload::Missing,
        Some(Value::Object(map)) => Payload::Object(map.clone()),
        Some(_) => Payload::NotAnObject,
    }
}

fn body_id(req: &IncomingRequest) -> Option<&str> {
    req.body_field("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}
