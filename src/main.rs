//! APIM Probe CLI - gateway routing and rate-limit reporter.
//!
//! Run `apim-probe --help` for usage information.

use anyhow::Result;
use apim_probe::{Args, GatewayConfig, OutputMode, ProbeConfig, Runner};
use console::style;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be set
    dotenv::dotenv().ok();

    let args = Args::parse_args();

    setup_logging(&args);

    let output = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    if output == OutputMode::Human && !args.json_logs {
        print_banner();
    }

    let config = match ProbeConfig::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    let gateway = GatewayConfig::from_args(&args);

    info!(
        model = %config.model,
        api_version = %config.api_version,
        repeat = config.repeat_count,
        "Starting probe"
    );

    let runner = Runner::new(gateway, config.clone(), output)?;
    let summary = runner.run().await;

    if output == OutputMode::Human && config.repeat_count > 1 {
        summary.print_summary();
    }

    if summary.all_failed() {
        std::process::exit(1);
    }

    Ok(())
}

fn setup_logging(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("apim_probe={level}")));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn print_banner() {
    println!(
        "{} {}",
        style("APIM Probe").cyan().bold(),
        style(format!("v{}", apim_probe::VERSION)).white().dim()
    );
    println!(
        "    {}",
        style("Backend routing and rate-limit reporter").white().dim()
    );
}
