//! Shared types for crab-dine
//!
//! Error types, the restaurant model, and time helpers used by the
//! service crate and its tests.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorBody, ErrorCode};
pub use models::Restaurant;
