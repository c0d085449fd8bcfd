//! Serde helpers for configuration values
//!
//! Timeouts and intervals are written as integer milliseconds in config files
//! and environment variables, so `Duration` fields go through
//! [`duration_millis`].

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// `Duration` as a `u64` count of milliseconds
///
/// ```rust
/// use std::time::Duration;
///
/// use accountlink_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Timeouts {
///     #[serde(with = "duration_millis")]
///     request: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
