//! Data models
//!
//! Records are schemaless JSON documents in the store; the typed view lives
//! here so both the admin and recommendation paths agree on field names.

pub mod restaurant;

// Re-exports
pub use restaurant::*;
