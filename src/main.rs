use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;

use portscan_rs::{config::ServerArgs, logging, server};

/// pscan — a server that runs TCP connect scans submitted over HTTP.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pscan",
    version,
    about = "pscan is a server for scanning ports",
    long_about = None
)]
struct Cli {
    /// Port to listen for requests on.
    #[arg(long, default_value_t = 8080)]
    port: u64,

    /// Connect timeout per scanned address, in milliseconds.
    #[arg(long = "probe-timeout-ms")]
    probe_timeout_ms: Option<u64>,

    /// Seconds open requests may run after a shutdown signal.
    #[arg(long = "grace-period-secs")]
    grace_period_secs: Option<u64>,

    /// Slots in the intake queue between request handlers and the dispatcher.
    #[arg(long = "queue-capacity")]
    queue_capacity: Option<usize>,

    /// Cap on probes in flight across all scans. Unbounded when omitted.
    #[arg(long = "max-concurrent-probes")]
    max_concurrent_probes: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(LevelFilter::INFO, cli.verbose);

    let config = ServerArgs {
        listen_port: Some(cli.port),
        probe_timeout_ms: cli.probe_timeout_ms,
        grace_period_secs: cli.grace_period_secs,
        queue_capacity: cli.queue_capacity,
        max_concurrent_probes: cli.max_concurrent_probes,
    }
    .validate()?;

    server::run(config).await
}
