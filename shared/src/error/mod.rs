//! Unified error system for crab-dine
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`AppError`]: Error type with code and message
//! - [`ErrorBody`]: JSON body returned to callers on failure
//!
//! # Error Code Ranges
//!
//! - 0xxx: Request errors
//! - 1xxx: Authentication errors
//! - 6xxx: Restaurant errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::RestaurantNotFound);
//! assert_eq!(err.message, "Restaurant not found");
//!
//! let err = AppError::required_field("name");
//! assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
//! ```

mod codes;
mod http;
mod types;

pub use codes::ErrorCode;
pub use types::{AppError, AppResult, ErrorBody};
