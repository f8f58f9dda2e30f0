use anyhow::Result;
use clap::{Parser, Subcommand};

use portscan_rs::client::{self, ClientArgs};
use portscan_rs::logging;
use tracing::level_filters::LevelFilter;

/// pscli — submit scans to a pscan server and read their results.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pscli",
    version,
    about = "pscli is a client for issuing port scanning requests to a pscan server",
    long_about = None
)]
struct Cli {
    /// Host of the pscan server, e.g. 127.0.0.1:8080 or https://scans.example.com.
    #[arg(long, global = true, default_value = "")]
    host: String,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Submit a new scan request.
    Submit {
        /// Comma separated IPs to scan.
        #[arg(long, value_delimiter = ',')]
        ips: Option<Vec<String>>,

        /// Port to scan on every IP.
        #[arg(long)]
        port: Option<String>,
    },
    /// Query a scan request.
    Query {
        /// Id returned by `submit`.
        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Warnings only by default so command output stays readable.
    logging::init(LevelFilter::WARN, cli.verbose);

    let http = client::default_client()?;
    match cli.command {
        Command::Submit { ips, port } => {
            let args = ClientArgs {
                host: cli.host,
                ips,
                port,
                scan_id: None,
            };
            let call = args.prepare_submit()?;
            let outcome = client::submit(&http, &call).await?;
            println!("{}", client::describe_submit(&outcome));
            if matches!(outcome, client::SubmitOutcome::Rejected { .. }) {
                anyhow::bail!("scan was not accepted");
            }
        }
        Command::Query { id } => {
            let args = ClientArgs {
                host: cli.host,
                ips: None,
                port: None,
                scan_id: id,
            };
            let call = args.prepare_query()?;
            let outcome = client::query(&http, &call).await?;
            if matches!(outcome, client::QueryOutcome::Refused { .. }) {
                anyhow::bail!(client::describe_query(call.request.id, &outcome));
            }
            println!("{}", client::describe_query(call.request.id, &outcome));
        }
    }
    Ok(())
}
