//! HTTP transport for gateway probes.
//!
//! One attempt per probe, bounded by the configured timeout. Connection
//! errors, timeouts, error statuses and undecodable bodies all surface as
//! [`crate::ProbeError::Transport`].

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::headers::{RateLimitSnapshot, RoutingSnapshot};
use crate::request::{ProbeRequest, RequestContext};
use reqwest::{header, Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Everything captured from a successful probe.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// Parsed JSON response body.
    pub body: serde_json::Value,
    /// Quota headers.
    pub rate_limits: RateLimitSnapshot,
    /// Routing headers and derived backend.
    pub routing: RoutingSnapshot,
    /// HTTP status returned by the gateway.
    pub status: StatusCode,
    /// Time from send to decoded body.
    pub latency: Duration,
}

/// HTTP client wrapper bound to a probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    client: Client,
    config: Arc<ProbeConfig>,
}

impl ProbeClient {
    /// Create a new probe client.
    pub fn new(config: Arc<ProbeConfig>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// The configuration requests are built with.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Send one probe, logging and collapsing any failure to `None`.
    pub async fn probe(&self, ctx: &RequestContext) -> Option<ProbeOutcome> {
        match self.try_probe(ctx).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(request_id = %ctx.correlation_id, "{}", e);
                None
            }
        }
    }

    /// Send one probe and return the captured outcome.
    pub async fn try_probe(&self, ctx: &RequestContext) -> Result<ProbeOutcome> {
        let request = ProbeRequest::build(ctx, &self.config);

        info!(url = %request.url, "Posting request");
        info!(request_id = %ctx.correlation_id, issued_at = %ctx.issued_at, "Request ID");

        let start = Instant::now();
        let response = self.send(&request).await?;
        let status = response.status();
        let headers = response.headers().clone();

        let body: serde_json::Value = response.json().await?;
        let latency = start.elapsed();

        debug!(
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Response received"
        );

        Ok(ProbeOutcome {
            body,
            rate_limits: RateLimitSnapshot::from_headers(&headers),
            routing: RoutingSnapshot::from_headers(&headers, ctx.request_id()),
            status,
            latency,
        })
    }

    /// Send a built request without retries. Non-2xx statuses are errors.
    async fn send(&self, request: &ProbeRequest) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url);

        // Headers first so `json` keeps our Content-Type instead of adding its own.
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        let response = builder.json(&request.body).send().await?;
        Ok(response.error_for_status()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::headers::BackendService;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context(gateway_url: &str) -> RequestContext {
        RequestContext::new(&GatewayConfig {
            gateway_url: gateway_url.to_string(),
            subscription_key: "test-key".to_string(),
        })
    }

    fn client() -> ProbeClient {
        ProbeClient::new(Arc::new(ProbeConfig::default())).unwrap()
    }

    fn completion() -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "Take the train."}}]
        })
    }

    #[tokio::test]
    async fn test_probe_captures_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-35-turbo/chat/completions"))
            .and(query_param("api-version", "2024-03-01-preview"))
            .and(header("Ocp-Apim-Subscription-Key", "test-key"))
            .and(header("x-request-backend", "unknown"))
            .and(body_partial_json(serde_json::json!({"max_tokens": 200})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion())
                    .insert_header("x-ms-region", "West US")
                    .insert_header("x-ratelimit-remaining-requests", "5")
                    .insert_header("x-request-duration", "87"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server.uri());
        let outcome = client().probe(&ctx).await.expect("probe should succeed");

        assert_eq!(outcome.status, StatusCode::OK);
        assert_eq!(outcome.body["id"], "chatcmpl-1");
        assert_eq!(outcome.routing.backend_service, BackendService::OpenAiWestUs);
        assert_eq!(outcome.routing.request_id, ctx.request_id());
        assert_eq!(outcome.routing.retry_count, "0");
        assert_eq!(outcome.routing.request_duration_ms.as_deref(), Some("87"));
        assert_eq!(outcome.rate_limits.remaining_requests.as_deref(), Some("5"));
        assert!(crate::threshold::check_rate_limits(&outcome.rate_limits));
    }

    #[tokio::test]
    async fn test_correlation_headers_match() {
        let server = MockServer::start().await;
        let ctx = context(&server.uri());
        let id = ctx.request_id();

        Mock::given(method("POST"))
            .and(header("x-ms-client-request-id", id.as_str()))
            .and(header("x-correlation-id", id.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion()))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client().probe(&ctx).await.is_some());
    }

    #[tokio::test]
    async fn test_error_status_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("x-ratelimit-remaining-requests", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let ctx = context(&server.uri());
        let err = client().try_probe(&ctx).await.unwrap_err();
        assert!(err.is_transport());
        assert!(client().probe(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn test_non_json_body_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client().try_probe(&context(&server.uri())).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_connection_refused_is_none() {
        // Nothing listens on port 1.
        let ctx = context("http://127.0.0.1:1");
        assert!(client().probe(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_gateway_is_none() {
        let ctx = RequestContext::new(&GatewayConfig::default());
        assert!(client().probe(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = ProbeConfig {
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let client = ProbeClient::new(Arc::new(config)).unwrap();
        let err = client.try_probe(&context(&server.uri())).await.unwrap_err();
        assert!(err.is_transport());
    }
}
