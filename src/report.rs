//! Console presentation of probe outcomes.
//!
//! All writers take an `io::Write` so the output can be captured; the
//! `print_*` helpers target stdout and drop write errors.

use crate::client::ProbeOutcome;
use crate::headers::{RateLimitSnapshot, RoutingSnapshot};
use crate::threshold::LowQuota;
use console::style;
use serde::Serialize;
use std::io::{self, Write};

const UNKNOWN: &str = "Unknown";

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(out, "{text}")
}

/// Indented dump of the response body.
pub fn write_response<W: Write>(out: &mut W, body: &serde_json::Value) -> io::Result<()> {
    writeln!(out, "\n{}", style("API Response:").bold())?;
    write_json(out, body)
}

/// Indented dump of every rate-limit header, `null` where absent.
pub fn write_rate_limits<W: Write>(out: &mut W, limits: &RateLimitSnapshot) -> io::Result<()> {
    writeln!(out, "\n{}", style("Rate Limit Information:").bold())?;
    writeln!(out, "\nComplete Rate Limit Headers:")?;
    write_json(out, limits)
}

/// Running-low warning line.
pub fn write_warning<W: Write>(out: &mut W, low: LowQuota) -> io::Result<()> {
    writeln!(out, "{} {}", style("Warning:").yellow().bold(), low)
}

/// Routing dump followed by the backend and timing summaries.
pub fn write_routing<W: Write>(out: &mut W, routing: &RoutingSnapshot) -> io::Result<()> {
    writeln!(out, "\n{}", style("Routing Information:").bold())?;
    write_json(out, routing)?;

    writeln!(out, "\n{}", style("Backend Service Details:").bold())?;
    writeln!(out, "Request ID: {}", routing.request_id)?;
    writeln!(out, "Backend: {}", routing.backend_service)?;
    writeln!(out, "Region: {}", or_unknown(&routing.region))?;
    writeln!(out, "Correlation ID: {}", or_unknown(&routing.correlation_id))?;
    writeln!(out, "Retry Count: {}", routing.retry_count)?;
    writeln!(out, "Test Header: {}", routing.test.as_deref().unwrap_or("0"))?;

    writeln!(out, "\n{}", style("Timing and Cache Information:").bold())?;
    writeln!(out, "Request Time (UTC): {}", or_unknown(&routing.request_time))?;
    writeln!(
        out,
        "Request Duration: {} ms",
        or_unknown(&routing.request_duration_ms)
    )?;
    writeln!(out, "Cache Status: {}", or_unknown(&routing.cache_status))?;
    writeln!(out, "Correlation ID: {}", or_unknown(&routing.correlation_id))?;
    writeln!(
        out,
        "Backend Service: {}",
        or_unknown(&routing.backend_service_header)
    )
}

/// Full human-readable report for one probe.
pub fn write_outcome<W: Write>(
    out: &mut W,
    outcome: &ProbeOutcome,
    low: Option<LowQuota>,
) -> io::Result<()> {
    write_response(out, &outcome.body)?;
    write_rate_limits(out, &outcome.rate_limits)?;
    if let Some(low) = low {
        write_warning(out, low)?;
    }
    write_routing(out, &outcome.routing)
}

/// One compact JSON object per probe.
pub fn write_outcome_json<W: Write>(
    out: &mut W,
    outcome: &ProbeOutcome,
    low: Option<LowQuota>,
) -> io::Result<()> {
    let record = serde_json::json!({
        "status": outcome.status.as_u16(),
        "latency_ms": outcome.latency.as_millis() as u64,
        "response": outcome.body,
        "rate_limits": outcome.rate_limits,
        "routing": outcome.routing,
        "running_low": low.is_some(),
        "warning": low.map(|l| l.to_string()),
    });
    let line = serde_json::to_string(&record).map_err(io::Error::other)?;
    writeln!(out, "{line}")
}

/// Print the human-readable report to stdout.
pub fn print_outcome(outcome: &ProbeOutcome, low: Option<LowQuota>) {
    let _ = write_outcome(&mut io::stdout().lock(), outcome, low);
}

/// Print the JSON record to stdout.
pub fn print_outcome_json(outcome: &ProbeOutcome, low: Option<LowQuota>) {
    let _ = write_outcome_json(&mut io::stdout().lock(), outcome, low);
}
