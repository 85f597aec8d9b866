//! Early warning when the subscription is close to its quota.

use crate::headers::RateLimitSnapshot;
use std::fmt;
use tracing::{debug, warn};

/// Remaining requests below this count as running low.
pub const MIN_REMAINING_REQUESTS: i64 = 10;

/// Remaining tokens below this count as running low.
pub const MIN_REMAINING_TOKENS: i64 = 1000;

/// Which quota crossed its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowQuota {
    /// Remaining requests, with the reported count.
    Requests(i64),
    /// Remaining tokens, with the reported count.
    Tokens(i64),
}

impl fmt::Display for LowQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requests(n) => write!(f, "Only {n} requests remaining!"),
            Self::Tokens(n) => write!(f, "Only {n} tokens remaining!"),
        }
    }
}

fn parse_remaining(field: &str, value: Option<&str>) -> Option<i64> {
    let value = value?;
    match value.trim().parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => {
            debug!(field, value, error = %e, "Ignoring non-numeric rate-limit value");
            None
        }
    }
}

/// First crossed threshold, requests before tokens.
pub fn low_quota(limits: &RateLimitSnapshot) -> Option<LowQuota> {
    if let Some(n) = parse_remaining("requests", limits.remaining_requests.as_deref()) {
        if n < MIN_REMAINING_REQUESTS {
            return Some(LowQuota::Requests(n));
        }
    }

    if let Some(n) = parse_remaining("tokens", limits.remaining_tokens.as_deref()) {
        if n < MIN_REMAINING_TOKENS {
            return Some(LowQuota::Tokens(n));
        }
    }

    None
}

/// Like [`low_quota`], but logs a warning for the crossed threshold.
pub fn warn_if_low(limits: &RateLimitSnapshot) -> Option<LowQuota> {
    let low = low_quota(limits)?;
    warn!(quota = ?low, "{}", low);
    Some(low)
}

/// Returns true if the subscription is running low, logging which quota tripped.
///
/// Only the first crossed threshold is reported even when both are low.
pub fn check_rate_limits(limits: &RateLimitSnapshot) -> bool {
    warn_if_low(limits).is_some()
}
