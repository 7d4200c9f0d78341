//! `Retry-After` header parsing
//!
//! Backends answer 429 with either delay-seconds or an HTTP-date (RFC 7231).
//! Both forms are reduced to whole seconds from now so the gateway can report
//! how long the rate-limited backend asked callers to wait.

use chrono::{DateTime, Utc};
use tracing::debug;

/// Parse a `Retry-After` value into seconds from now.
///
/// A date in the past yields `Some(0)`. Unparsable values yield `None`.
///
/// ```
/// use assay_egress::parse_retry_after;
///
/// assert_eq!(parse_retry_after("30"), Some(30));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    let value = header_value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }

    match DateTime::parse_from_rfc2822(value) {
        Ok(at) => Some(seconds_until(at.with_timezone(&Utc), Utc::now())),
        Err(_) => {
            debug!(header_value = value, "Ignoring unparsable retry-after header");
            None
        }
    }
}

fn seconds_until(at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from(at.signed_duration_since(now).num_seconds()).unwrap_or(0)
}
