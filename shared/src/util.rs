use chrono::Local;

/// Format used in the `requestTime` field of every response body
pub const REQUEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of `createdAt` / `updatedAt` (local ISO-8601, microsecond precision)
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Local wall-clock time for the `requestTime` response field
pub fn request_time() -> String {
    Local::now().format(REQUEST_TIME_FORMAT).to_string()
}

/// Local ISO-8601 timestamp for record metadata
pub fn record_timestamp() -> String {
    Local::now().format(RECORD_TIME_FORMAT).to_string()
}

/// Current local time of day as zero-padded `HH:MM`
pub fn local_hhmm() -> String {
    Local::now().format("%H:%M").to_string()
}
