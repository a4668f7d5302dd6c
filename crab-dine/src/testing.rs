//! Test doubles and router helpers

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::response::Response;
use http::Request;
use serde_json::{Map, Value};
use shared::models::Restaurant;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use crate::audit::{AuditError, AuditSink, RequestLog};
use crate::secrets::{ADMIN_API_KEY, SecretResolver, SecretSource};
use crate::state::AppState;
use crate::store::{MemoryStore, RecordStore, StoreConnector, StoreError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const ADMIN_KEY: &str = "test-admin-key";

/// In-memory vault that counts lookups
pub struct StaticSecrets {
    values: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StaticSecrets {
    pub fn new<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretSource for StaticSecrets {
    async fn fetch(&self, name: &str) -> Result<String, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| format!("secret {name} not found").into())
    }
}

/// Audit sink that keeps every record
#[derive(Clone, Default)]
pub struct RecordingAudit {
    entries: Arc<Mutex<Vec<RequestLog>>>,
}

impl RecordingAudit {
    pub fn entries(&self) -> Vec<RequestLog> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn log(&self, entry: &RequestLog) -> Result<(), AuditError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Audit sink that always fails
pub struct FailingAudit;

#[async_trait]
impl AuditSink for FailingAudit {
    async fn log(&self, _entry: &RequestLog) -> Result<(), AuditError> {
        Err(AuditError::Upload("storage offline".into()))
    }
}

/// Store whose connection always fails
#[derive(Clone, Copy)]
pub struct UnreachableStore;

#[async_trait]
impl StoreConnector for UnreachableStore {
    async fn connect(&self) -> Result<Box<dyn RecordStore>, StoreError> {
        Err(StoreError::Request {
            status: 503,
            body: "service unavailable".into(),
        })
    }
}

/// A restaurant open all day
pub fn restaurant(id: &str, style: &str) -> Restaurant {
    restaurant_open(id, style, "00:00", "23:59")
}

pub fn restaurant_open(id: &str, style: &str, open: &str, close: &str) -> Restaurant {
    Restaurant {
        id: id.to_string(),
        name: format!("Restaurant {id}"),
        style: style.to_string(),
        open_hour: open.to_string(),
        close_hour: close.to_string(),
        price_range: "$".to_string(),
        vegetarian: None,
        deliveries: None,
        created_at: None,
        updated_at: None,
        is_open_now: None,
        extra: Map::new(),
    }
}

fn secrets_with_admin_key() -> SecretResolver {
    SecretResolver::new(Arc::new(StaticSecrets::new([(ADMIN_API_KEY, ADMIN_KEY)])))
        .with_env_lookup(|_| None)
}

fn state(
    secrets: SecretResolver,
    store: Arc<dyn StoreConnector>,
    audit: Arc<dyn AuditSink>,
    fallback: Vec<Restaurant>,
) -> Arc<AppState> {
    Arc::new(AppState {
        secrets,
        store,
        audit,
        fallback: Arc::new(fallback),
    })
}

/// State over a memory store seeded with `records`
pub fn test_state(records: Vec<Restaurant>) -> (Arc<AppState>, MemoryStore, RecordingAudit) {
    let store = MemoryStore::with_records(records);
    let audit = RecordingAudit::default();
    let app_state = state(
        secrets_with_admin_key(),
        Arc::new(store.clone()),
        Arc::new(audit.clone()),
        Vec::new(),
    );
    (app_state, store, audit)
}

/// State whose store never connects; the fallback holds one restaurant
pub fn unreachable_state() -> (Arc<AppState>, UnreachableStore, RecordingAudit) {
    let audit = RecordingAudit::default();
    let app_state = state(
        secrets_with_admin_key(),
        Arc::new(UnreachableStore),
        Arc::new(audit.clone()),
        vec![restaurant("fallback", "Diner")],
    );
    (app_state, UnreachableStore, audit)
}

pub fn state_without_admin_key() -> Arc<AppState> {
    let secrets = SecretResolver::new(Arc::new(StaticSecrets::new::<&str, &str>([])))
        .with_env_lookup(|_| None);
    state(
        secrets,
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingAudit::default()),
        Vec::new(),
    )
}

pub fn state_with_failing_audit(records: Vec<Restaurant>) -> Arc<AppState> {
    state(
        secrets_with_admin_key(),
        Arc::new(MemoryStore::with_records(records)),
        Arc::new(FailingAudit),
        Vec::new(),
    )
}

/// Drive the router in-process
pub async fn send(app: Router, request: Request<Body>) -> Response {
    match app.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

pub async fn read_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
