//! Recommendation API
//!
//! Public. Filters come from the query string and, for POST, the JSON body
//! (body wins on collision).

use axum::extract::State;
use axum::response::Response;
use axum::{Router, routing::get};
use http::StatusCode;
use serde_json::{Value, json};
use shared::error::{AppError, AppResult};
use shared::models::Restaurant;
use shared::util::{local_hhmm, request_time};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::reply;
use crate::audit::{self, RequestLog};
use crate::filter::{FilterParams, filter_restaurants, is_open};
use crate::request::IncomingRequest;
use crate::restaurants;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/recommend", get(handle).post(handle))
}

async fn handle(State(state): State<Arc<AppState>>, req: IncomingRequest) -> Response {
    audit::record(state.audit.as_ref(), RequestLog::capture(&req)).await;

    match recommend(&state, &req, &local_hhmm()).await {
        Ok(matches) if matches.is_empty() => {
            tracing::info!(result = "no_match", "Recommendation served");
            reply(
                StatusCode::NOT_FOUND,
                json!({
                    "message": "No restaurants match your criteria",
                    "requestTime": request_time(),
                }),
            )
        }
        Ok(matches) => {
            tracing::info!(result = "success", matches = matches.len(), "Recommendation served");
            reply(
                StatusCode::OK,
                json!({
                    "totalMatches": matches.len(),
                    "restaurants": matches,
                    "requestTime": request_time(),
                }),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Recommendation failed");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "An error occurred processing your request",
                    "details": e.message,
                    "requestTime": request_time(),
                }),
            )
        }
    }
}

/// Matching restaurants, each tagged with `isOpenNow` at `now`
async fn recommend(state: &AppState, req: &IncomingRequest, now: &str) -> AppResult<Vec<Restaurant>> {
    let params = merged_params(req)?;
    tracing::debug!(?params, now, "Recommendation parameters");

    let all = fetch_all(state).await;
    let filter = FilterParams::from_map(&params);
    let mut matches = filter_restaurants(&filter, &all, now);
    for restaurant in &mut matches {
        restaurant.is_open_now = Some(is_open(&restaurant.open_hour, &restaurant.close_hour, now));
    }
    Ok(matches)
}

/// Every stored restaurant, or the static fallback list if the store fails
async fn fetch_all(state: &AppState) -> Vec<Restaurant> {
    match restaurants::list(state.store.as_ref()).await {
        Ok(all) => all,
        Err(e) => {
            tracing::warn!(
                error = %e,
                fallback = state.fallback.len(),
                "Error fetching restaurants, falling back to static list"
            );
            state.fallback.as_ref().clone()
        }
    }
}

/// Query parameters overlaid with body fields
///
/// Strings are taken verbatim, nulls skipped, anything else by its JSON
/// text. A body that is JSON but not an object is an error.
fn merged_params(req: &IncomingRequest) -> AppResult<BTreeMap<String, String>> {
    let mut params = req.query_params().clone();
    match req.body() {
        None | Some(Value::Null) => {}
        Some(Value::Object(fields)) => {
            for (key, value) in fields {
                let text = match value {
                    Value::Null => continue,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                params.insert(key.clone(), text);
            }
        }
        Some(other) => {
            return Err(AppError::invalid_request(format!(
                "Request body must be a JSON object, got {other}"
            )));
        }
    }
    Ok(params)
}
