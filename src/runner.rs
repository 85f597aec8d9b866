//! Sequential probe loop.
//!
//! Each iteration gets its own [`RequestContext`], so no correlation id is
//! ever reused. Iterations never overlap.

use crate::client::{ProbeClient, ProbeOutcome};
use crate::config::{GatewayConfig, ProbeConfig};
use crate::error::Result;
use crate::report;
use crate::request::RequestContext;
use crate::threshold::{self, LowQuota};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How outcomes are written to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Pretty JSON dumps plus the routing summary.
    #[default]
    Human,
    /// One JSON object per probe.
    Json,
    /// Nothing; the caller inspects the returned summary.
    Silent,
}

/// Drives `repeat_count` probes against one gateway.
pub struct Runner {
    gateway: GatewayConfig,
    client: ProbeClient,
    output: OutputMode,
}

impl Runner {
    /// Create a new runner.
    pub fn new(gateway: GatewayConfig, config: ProbeConfig, output: OutputMode) -> Result<Self> {
        let client = ProbeClient::new(Arc::new(config))?;
        Ok(Self {
            gateway,
            client,
            output,
        })
    }

    /// Run one probe: send, check quota, report. Returns `None` on transport failure.
    pub async fn run_once(&self) -> Option<(ProbeOutcome, Option<LowQuota>)> {
        let ctx = RequestContext::new(&self.gateway);
        let outcome = self.client.probe(&ctx).await?;

        let low = threshold::warn_if_low(&outcome.rate_limits);

        match self.output {
            OutputMode::Human => report::print_outcome(&outcome, low),
            OutputMode::Json => report::print_outcome_json(&outcome, low),
            OutputMode::Silent => {}
        }

        Some((outcome, low))
    }

    /// Run all configured probes in order.
    pub async fn run(&self) -> ProbeSummary {
        let repeat = self.client.config().repeat_count;
        let start = Instant::now();
        let mut summary = ProbeSummary::default();

        for iteration in 1..=repeat {
            debug!(iteration, repeat, "Starting probe");
            match self.run_once().await {
                Some((outcome, low)) => summary.record_success(outcome.latency, low.is_some()),
                None => summary.record_failure(),
            }
        }

        summary.elapsed = start.elapsed();
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Probing finished"
        );
        summary
    }
}

/// Tally of a probe run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeSummary {
    /// Probes sent.
    pub attempted: u32,
    /// Probes that returned a JSON body.
    pub succeeded: u32,
    /// Probes that hit a transport failure.
    pub failed: u32,
    /// Successful probes that reported a low quota.
    pub running_low: u32,
    /// Sum of successful probe latencies.
    pub total_latency: Duration,
    /// Wall time for the whole run.
    pub elapsed: Duration,
}

impl ProbeSummary {
    fn record_success(&mut self, latency: Duration, running_low: bool) {
        self.attempted += 1;
        self.succeeded += 1;
        self.total_latency += latency;
        if running_low {
            self.running_low += 1;
        }
    }

    fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    /// Average latency of successful probes in milliseconds.
    pub fn avg_latency_ms(&self) -> f64 {
        if self.succeeded == 0 {
            0.0
        } else {
            self.total_latency.as_secs_f64() * 1000.0 / f64::from(self.succeeded)
        }
    }

    /// True when at least one probe was sent and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.succeeded == 0
    }

    /// Print a summary of the run.
    pub fn print_summary(&self) {
        println!("\n{}", "═".repeat(60));
        println!("                    PROBING COMPLETE");
        println!("{}", "═".repeat(60));
        println!("  Probes Sent:      {}", self.attempted);
        println!("  Successful:       {}", self.succeeded);
        println!("  Failed:           {}", self.failed);
        println!("  Running Low:      {}", self.running_low);
        println!("  Elapsed Time:     {:.2}s", self.elapsed.as_secs_f64());
        println!("  Avg Latency:      {:.1}ms", self.avg_latency_ms());
        println!("{}", "═".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn gateway(url: &str) -> GatewayConfig {
        GatewayConfig {
            gateway_url: url.to_string(),
            subscription_key: "k".to_string(),
        }
    }

    fn config(repeat_count: u32) -> ProbeConfig {
        ProbeConfig {
            repeat_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_math() {
        let mut summary = ProbeSummary::default();
        summary.record_success(Duration::from_millis(100), false);
        summary.record_success(Duration::from_millis(300), true);
        summary.record_failure();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.running_low, 1);
        assert_eq!(summary.avg_latency_ms(), 200.0);
        assert!(!summary.all_failed());
    }

    #[tokio::test]
    async fn test_repeat_uses_fresh_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true}))
                    .insert_header("x-ms-region", "UK South"),
            )
            .expect(3)
            .mount(&server)
            .await;

        let runner = Runner::new(gateway(&server.uri()), config(3), OutputMode::Silent).unwrap();
        let summary = runner.run().await;
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 0);

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let mut ids: Vec<String> = requests
            .iter()
            .map(|r| r.headers.get("x-correlation-id").unwrap().to_str().unwrap().to_string())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_connection_error_skips_reporting() {
        let runner = Runner::new(gateway("http://127.0.0.1:1"), config(2), OutputMode::Silent).unwrap();

        assert!(runner.run_once().await.is_none());

        let summary = runner.run().await;
        assert_eq!(summary.failed, 2);
        assert!(summary.all_failed());
    }

    #[tokio::test]
    async fn test_low_quota_scenario() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true}))
                    .insert_header("x-ms-region", "West US")
                    .insert_header("x-ratelimit-remaining-requests", "5"),
            )
            .mount(&server)
            .await;

        let runner = Runner::new(gateway(&server.uri()), config(1), OutputMode::Silent).unwrap();
        let (outcome, low) = runner.run_once().await.unwrap();

        assert_eq!(outcome.routing.backend_service.as_str(), "OpenAIWUS");
        let low = low.unwrap();
        assert!(low.to_string().contains("5 requests remaining"));
    }

    #[tokio::test]
    async fn test_no_rate_limit_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let runner = Runner::new(gateway(&server.uri()), config(1), OutputMode::Silent).unwrap();
        let (outcome, low) = runner.run_once().await.unwrap();

        assert!(outcome.rate_limits.is_empty());
        assert!(low.is_none());
        assert!(!threshold::check_rate_limits(&outcome.rate_limits));
    }
}
