//! Restaurant Model
//!
//! Restaurants are stored as JSON documents keyed by `id`. Besides the typed
//! fields below a document may carry arbitrary extra keys (store metadata
//! such as `_etag`, or free-form fields an admin added); those ride along in
//! [`Restaurant::extra`] and are written back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// Fields an "add" payload must contain, checked in this order
pub const REQUIRED_FIELDS: [&str; 5] = ["name", "style", "openHour", "closeHour", "priceRange"];

/// Optional flags that accept a bool or a "true"/"false" string
pub const BOOLEAN_FIELDS: [&str; 2] = ["vegetarian", "deliveries"];

/// Keys an update payload can never overwrite
pub const PROTECTED_FIELDS: [&str; 4] = ["id", "createdAt", "updatedAt", "isOpenNow"];

/// Restaurant entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    /// Partition and lookup key, immutable after creation
    pub id: String,
    pub name: String,
    pub style: String,
    /// "HH:MM", 24h
    pub open_hour: String,
    /// "HH:MM", 24h; earlier than `open_hour` when the window wraps past midnight
    pub close_hour: String,
    pub price_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vegetarian: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliveries: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Computed for recommendation responses, never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open_now: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Restaurant {
    /// Validate an "add" payload and turn it into a new record
    ///
    /// Order of checks: required-field presence (first missing field is
    /// reported), boolean coercion, text field types, then id and
    /// timestamp generation. `now` becomes both `createdAt` and `updatedAt`.
    pub fn create(mut data: Map<String, Value>, now: &str) -> AppResult<Self> {
        if let Some(missing) = REQUIRED_FIELDS
            .iter()
            .find(|field| !data.contains_key(**field))
        {
            return Err(AppError::required_field(missing));
        }

        coerce_booleans(&mut data)?;
        check_text_fields(&data)?;

        data.remove("isOpenNow");
        match data.get("id") {
            None => {
                let name = data.get("name").and_then(Value::as_str).unwrap_or_default();
                let id = generate_id(name, now);
                data.insert("id".into(), Value::String(id));
            }
            Some(Value::String(id)) if !id.is_empty() => {}
            Some(_) => return Err(AppError::validation("Field id must be a non-empty string")),
        }

        data.insert("createdAt".into(), Value::String(now.to_string()));
        data.insert("updatedAt".into(), Value::String(now.to_string()));

        Self::from_document(data)
    }

    /// Decode a stored document
    pub fn from_document(data: Map<String, Value>) -> AppResult<Self> {
        serde_json::from_value(Value::Object(data))
            .map_err(|e| AppError::validation(format!("Invalid restaurant document: {e}")))
    }

    /// Decode a document already in the store
    ///
    /// Older writes may hold flags as strings; those are coerced like on
    /// create. A flag of any other non-boolean type is dropped.
    pub fn from_stored(mut data: Map<String, Value>) -> AppResult<Self> {
        for field in BOOLEAN_FIELDS {
            let coerced = match data.get(field) {
                None | Some(Value::Bool(_)) => continue,
                Some(Value::String(s)) => Some(s.eq_ignore_ascii_case("true")),
                Some(_) => None,
            };
            match coerced {
                Some(flag) => data.insert(field.to_string(), Value::Bool(flag)),
                None => data.remove(field),
            };
        }
        Self::from_document(data)
    }

    /// Encode as a JSON object
    pub fn to_document(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Merge an update payload into this record
    ///
    /// Every supplied key overwrites the stored one except
    /// [`PROTECTED_FIELDS`]. Boolean flags go through the same coercion
    /// as on create. `updatedAt` is refreshed but never moves backwards.
    pub fn merge(&self, patch: &Map<String, Value>, now: &str) -> AppResult<Self> {
        let mut doc = self.to_document();
        for (key, value) in patch {
            if PROTECTED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            doc.insert(key.clone(), value.clone());
        }

        coerce_booleans(&mut doc)?;
        check_text_fields(&doc)?;

        let mut merged = Self::from_document(doc)?;
        merged.id = self.id.clone();
        merged.created_at = self.created_at.clone();
        merged.is_open_now = None;
        merged.touch(now);
        Ok(merged)
    }

    /// Refresh `updatedAt`, keeping it monotonically non-decreasing
    pub fn touch(&mut self, now: &str) {
        let keep_previous = self
            .updated_at
            .as_deref()
            .is_some_and(|prev| prev > now);
        if !keep_previous {
            self.updated_at = Some(now.to_string());
        }
    }
}

/// Deterministic id from name and creation timestamp (hex SHA-256)
pub fn generate_id(name: &str, created_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{name}-{created_at}").as_bytes());
    hex::encode(hasher.finalize())
}

/// Coerce `vegetarian` / `deliveries` into booleans in place
///
/// Strings become `true` iff they equal "true" case-insensitively; any other
/// non-boolean value is rejected.
pub fn coerce_booleans(data: &mut Map<String, Value>) -> AppResult<()> {
    for field in BOOLEAN_FIELDS {
        let coerced = match data.get(field) {
            None | Some(Value::Bool(_)) => continue,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(_) => {
                return Err(AppError::validation(format!(
                    "Field {field} must be a boolean"
                )));
            }
        };
        data.insert(field.to_string(), Value::Bool(coerced));
    }
    Ok(())
}

fn check_text_fields(data: &Map<String, Value>) -> AppResult<()> {
    for field in REQUIRED_FIELDS {
        if let Some(value) = data.get(field)
            && !value.is_string()
        {
            return Err(AppError::validation(format!(
                "Field {field} must be a string"
            )));
        }
    }
    Ok(())
}
