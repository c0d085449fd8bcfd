//! Protocol constants
//!
//! Header names, URL segments and limits shared by the client crates.

// Headers
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";
pub const APP_REFERENCE_HEADER: &str = "brightpearl-app-ref";
pub const DEVELOPER_REFERENCE_HEADER: &str = "brightpearl-dev-ref";
pub const ACCOUNT_TOKEN_HEADER: &str = "brightpearl-account-token";
pub const STAFF_TOKEN_HEADER: &str = "brightpearl-staff-token";
pub const REQUESTS_REMAINING_HEADER: &str = "x-requests-remaining";
pub const NEXT_THROTTLE_PERIOD_HEADER: &str = "x-next-throttle-period";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Lowercased fragment of a 503 body that marks an exhausted request cap
pub const REQUEST_CAP_MARKER: &str = "too many requests";

// URL segments
pub const PUBLIC_API_SEGMENT: &str = "public-api";
pub const MULTI_MESSAGE_SEGMENT: &str = "multi-message";
pub const AUTHORISE_SEGMENT: &str = "authorise";

// Container limits
pub const MAX_BATCH_SIZE: usize = 10;
pub const MIN_BATCH_SIZE: usize = 2;

// Container response statuses
pub const STATUS_ALL_OK: u16 = 200;
pub const STATUS_PARTIAL: u16 = 207;

// Session defaults
pub const DEFAULT_AUTH_LOCK_WAIT_MS: u64 = 15_000;
pub const DEFAULT_AUTH_RETRY_INTERVAL_MS: u64 = 5_000;

// HTTP defaults
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CONNECT_RETRIES: u32 = 2;
