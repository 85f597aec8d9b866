//! Extraction of rate-limit and routing metadata from response headers.
//!
//! Every field is optional. A missing header, or one whose value is not
//! visible ASCII, is recorded as `None`. The only exception is the retry
//! count, which falls back to `"0"`.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value recorded for `x-retry-count` when the gateway omits it.
pub const DEFAULT_RETRY_COUNT: &str = "0";

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Quota headers returned for the current key and deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct RateLimitSnapshot {
    #[serde(rename = "x-ratelimit-remaining-requests")]
    pub remaining_requests: Option<String>,
    #[serde(rename = "x-ratelimit-remaining-tokens")]
    pub remaining_tokens: Option<String>,
    #[serde(rename = "x-ratelimit-reset-requests")]
    pub reset_requests: Option<String>,
    #[serde(rename = "x-ratelimit-reset-tokens")]
    pub reset_tokens: Option<String>,
    #[serde(rename = "x-ratelimit-limit-requests")]
    pub limit_requests: Option<String>,
    #[serde(rename = "x-ratelimit-limit-tokens")]
    pub limit_tokens: Option<String>,
}

impl RateLimitSnapshot {
    /// Read the six `x-ratelimit-*` headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            remaining_requests: header_str(headers, "x-ratelimit-remaining-requests"),
            remaining_tokens: header_str(headers, "x-ratelimit-remaining-tokens"),
            reset_requests: header_str(headers, "x-ratelimit-reset-requests"),
            reset_tokens: header_str(headers, "x-ratelimit-reset-tokens"),
            limit_requests: header_str(headers, "x-ratelimit-limit-requests"),
            limit_tokens: header_str(headers, "x-ratelimit-limit-tokens"),
        }
    }

    /// True when the gateway sent none of the rate-limit headers.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Backend deployment that served the request, derived from `x-ms-region`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendService {
    /// UK South deployment.
    #[serde(rename = "OpenAIUKS")]
    OpenAiUkSouth,
    /// West US deployment.
    #[serde(rename = "OpenAIWUS")]
    OpenAiWestUs,
    /// Region missing or not one we know.
    #[default]
    Unknown,
}

impl BackendService {
    /// Classify a region header value. Matching is exact; first rule wins.
    pub fn classify(region: Option<&str>) -> Self {
        match region {
            Some("UK South") => Self::OpenAiUkSouth,
            Some("West US") => Self::OpenAiWestUs,
            _ => Self::Unknown,
        }
    }

    /// Display name of the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiUkSouth => "OpenAIUKS",
            Self::OpenAiWestUs => "OpenAIWUS",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BackendService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing, timing and cache metadata for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct RoutingSnapshot {
    /// Id we generated for the request.
    pub request_id: String,
    /// Classified backend.
    pub backend_service: BackendService,
    #[serde(rename = "x-ms-routing-name")]
    pub routing_name: Option<String>,
    #[serde(rename = "x-azure-ref")]
    pub azure_ref: Option<String>,
    #[serde(rename = "x-cache")]
    pub cache: Option<String>,
    #[serde(rename = "x-ms-region")]
    pub region: Option<String>,
    #[serde(rename = "x-ms-client-request-id")]
    pub client_request_id: Option<String>,
    #[serde(rename = "x-ms-request-id")]
    pub ms_request_id: Option<String>,
    #[serde(rename = "x-test")]
    pub test: Option<String>,
    #[serde(rename = "x-backend-service")]
    pub backend_service_header: Option<String>,
    #[serde(rename = "x-correlation-id")]
    pub correlation_id: Option<String>,
    /// `x-retry-count`, or `"0"` when absent.
    pub retry_count: String,
    /// `x-request-time`, as sent by the gateway (UTC).
    pub request_time: Option<String>,
    /// `x-request-duration`, in milliseconds.
    pub request_duration_ms: Option<String>,
    /// `x-cache-status`.
    pub cache_status: Option<String>,
}

impl RoutingSnapshot {
    /// Read routing headers for the request identified by `request_id`.
    pub fn from_headers(headers: &HeaderMap, request_id: impl Into<String>) -> Self {
        let region = header_str(headers, "x-ms-region");

        Self {
            request_id: request_id.into(),
            backend_service: BackendService::classify(region.as_deref()),
            routing_name: header_str(headers, "x-ms-routing-name"),
            azure_ref: header_str(headers, "x-azure-ref"),
            cache: header_str(headers, "x-cache"),
            region,
            client_request_id: header_str(headers, "x-ms-client-request-id"),
            ms_request_id: header_str(headers, "x-ms-request-id"),
            test: header_str(headers, "x-test"),
            backend_service_header: header_str(headers, "x-backend-service"),
            correlation_id: header_str(headers, "x-correlation-id"),
            retry_count: header_str(headers, "x-retry-count")
                .unwrap_or_else(|| DEFAULT_RETRY_COUNT.to_string()),
            request_time: header_str(headers, "x-request-time"),
            request_duration_ms: header_str(headers, "x-request-duration"),
            cache_status: header_str(headers, "x-cache-status"),
        }
    }
}
