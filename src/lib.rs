//! # APIM Probe
//!
//! Sends a chat completion through an Azure API Management gateway and reports
//! which backend served it and how much quota is left.
//!
//! ## Features
//!
//! - **Backend Classification**: Maps the `x-ms-region` response header to a backend name
//! - **Rate-Limit Snapshot**: Captures every `x-ratelimit-*` header, absent ones as `null`
//! - **Quota Warnings**: Flags when remaining requests or tokens run low
//! - **Correlation**: One fresh UUID per probe, sent as both client request id and correlation id
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apim_probe::{GatewayConfig, OutputMode, ProbeConfig, Runner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = GatewayConfig {
//!         gateway_url: "https://my-apim.azure-api.net".to_string(),
//!         subscription_key: "your-subscription-key".to_string(),
//!     };
//!
//!     let runner = Runner::new(gateway, ProbeConfig::default(), OutputMode::Human)?;
//!     let summary = runner.run().await;
//!
//!     summary.print_summary();
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The gateway URL and key come from `API_MANAGEMENT_GATEWAY_URL` and
//! `API_MANAGEMENT_SUBSCRIPTION_KEY`, optionally loaded from a `.env` file.
//! See [`ProbeConfig`] for the request settings.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod report;
pub mod request;
pub mod runner;
pub mod threshold;

// Re-exports for convenience
pub use client::{ProbeClient, ProbeOutcome};
pub use config::{Args, GatewayConfig, ProbeConfig};
pub use error::{ProbeError, Result};
pub use headers::{BackendService, RateLimitSnapshot, RoutingSnapshot};
pub use request::{ChatMessage, CompletionRequest, ProbeRequest, RequestContext};
pub use runner::{OutputMode, ProbeSummary, Runner};
pub use threshold::{check_rate_limits, LowQuota};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
