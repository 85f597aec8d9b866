//! Configuration management for the gateway probe.
//!
//! Gateway credentials come from the environment (optionally seeded from a
//! `.env` file), request shape settings from CLI flags or a JSON file.

use crate::error::{ProbeError, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Deployment name used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-35-turbo";

/// Azure OpenAI API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-03-01-preview";

/// CLI arguments for the probe.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "apim-probe",
    author = "Yiğit Konur <yigit@wope.com>",
    version,
    about = "Probe an API Management gateway and report backend routing and rate limits",
    long_about = "Sends a chat completion through an Azure API Management gateway, then prints\n\
                  the response body, the x-ratelimit-* headers and which backend served the call.",
    after_help = "EXAMPLES:\n    \
        apim-probe\n    \
        apim-probe --repeat 5 --timeout 20\n    \
        apim-probe --config probe.json --json"
)]
pub struct Args {
    /// Base URL of the API Management gateway
    #[arg(long, env = "API_MANAGEMENT_GATEWAY_URL", default_value = "", hide_default_value = true)]
    pub gateway_url: String,

    /// Subscription key sent as Ocp-Apim-Subscription-Key
    #[arg(
        long,
        env = "API_MANAGEMENT_SUBSCRIPTION_KEY",
        default_value = "",
        hide_default_value = true,
        hide_env_values = true
    )]
    pub subscription_key: String,

    /// Deployment name to call
    #[arg(short, long, env = "APIM_PROBE_MODEL")]
    pub model: Option<String>,

    /// Azure OpenAI api-version query parameter
    #[arg(long, env = "APIM_PROBE_API_VERSION")]
    pub api_version: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long, env = "APIM_PROBE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Number of sequential probes to send
    #[arg(short, long, env = "APIM_PROBE_REPEAT")]
    pub repeat: Option<u32>,

    /// Path to a probe configuration file (JSON)
    #[arg(short, long, env = "APIM_PROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print each probe as a single JSON object
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, env = "APIM_PROBE_VERBOSE")]
    pub verbose: bool,

    /// Output logs as JSON
    #[arg(long, env = "APIM_PROBE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Args {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Where to send probes and with which key.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Gateway base URL, without a trailing path.
    pub gateway_url: String,
    /// API Management subscription key.
    pub subscription_key: String,
}

impl GatewayConfig {
    /// Build from parsed arguments. Empty values are passed through untouched.
    pub fn from_args(args: &Args) -> Self {
        Self {
            gateway_url: args.gateway_url.clone(),
            subscription_key: args.subscription_key.clone(),
        }
    }
}

/// Settings that shape each probe request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Deployment name in the completions path.
    #[serde(default = "default_model")]
    pub model: String,

    /// Value of the `api-version` query parameter.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,

    /// How many probes the runner sends, one after another.
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_version: default_api_version(),
            timeout: default_timeout(),
            repeat_count: default_repeat_count(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_repeat_count() -> u32 {
    1
}

impl ProbeConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ProbeError::ConfigFile {
            path: path.clone(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ProbeError::ConfigParse {
            path: path.clone(),
            source: e,
        })
    }

    /// Create configuration from CLI arguments, layered over the config file if one is given.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(model) = &args.model {
            config.model = model.clone();
        }
        if let Some(api_version) = &args.api_version {
            config.api_version = api_version.clone();
        }
        if let Some(timeout) = args.timeout {
            config.timeout = Duration::from_secs(timeout);
        }
        if let Some(repeat) = args.repeat {
            config.repeat_count = repeat;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            return Err(ProbeError::InvalidConfig(
                "model cannot be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProbeError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.repeat_count == 0 {
            return Err(ProbeError::InvalidConfig(
                "repeat count must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Custom serde module for humantime Duration parsing.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // "ms" before "s", both end in 's'
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
