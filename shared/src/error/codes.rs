//! Unified error codes for crab-dine
//!
//! Error codes are organized by category:
//! - 0xxx: Request errors
//! - 1xxx: Authentication errors
//! - 6xxx: Restaurant errors
//! - 9xxx: System errors

use std::fmt;

/// Unified error code enum
///
/// Codes are u16 values so they read the same in logs as in the ranges
/// above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: Request ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// No admin key supplied, or none configured
    NotAuthenticated = 1001,
    /// Admin key mismatch
    InvalidCredentials = 1002,

    // ==================== 6xxx: Restaurant ====================
    /// Restaurant not found
    RestaurantNotFound = 6001,
    /// Restaurant id already exists
    RestaurantExists = 6002,
    /// Unknown admin action
    InvalidAction = 6003,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            ErrorCode::NotAuthenticated => "Valid admin credentials required",
            ErrorCode::InvalidCredentials => "Invalid admin key",

            ErrorCode::RestaurantNotFound => "Restaurant not found",
            ErrorCode::RestaurantExists => "Restaurant already exists",
            ErrorCode::InvalidAction => "Unknown admin action",

            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
