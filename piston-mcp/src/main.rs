//! Serves the `run_code` tool over stdio.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use piston_client::{ClientConfig, DEFAULT_EXECUTE_URL, DEFAULT_RUNTIMES_URL, PistonClient};
use piston_mcp::McpServer;
use piston_tools::{RunCodeTool, ToolRegistry};
use tokio::io::{BufReader, stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run code on a Piston deployment from any stdio tool client.
#[derive(Debug, Parser)]
#[command(name = "piston-mcp", version, about)]
struct Args {
    /// Endpoint listing the available runtimes.
    #[arg(long, env = "PISTON_RUNTIMES_URL", default_value = DEFAULT_RUNTIMES_URL)]
    runtimes_url: String,

    /// Endpoint accepting execute requests.
    #[arg(long, env = "PISTON_EXECUTE_URL", default_value = DEFAULT_EXECUTE_URL)]
    execute_url: String,

    /// Timeout for each request to the service, in seconds.
    #[arg(long, env = "PISTON_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Log filter directive; logs go to stderr.
    #[arg(long, env = "PISTON_LOG", default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&args.log_filter).context("invalid log filter directive")?,
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = ClientConfig::new()
        .with_runtimes_url(&args.runtimes_url)?
        .with_execute_url(&args.execute_url)?
        .with_timeout(Duration::from_secs(args.timeout_secs));
    let client = Arc::new(PistonClient::new(config));

    let registry = Arc::new(ToolRegistry::new());
    RunCodeTool::new(Arc::clone(&client)).register(&registry)?;

    info!(
        runtimes_url = %args.runtimes_url,
        execute_url = %args.execute_url,
        timeout_secs = args.timeout_secs,
        "serving run_code over stdio"
    );

    McpServer::new(registry)
        .serve(BufReader::new(stdin()), stdout())
        .await
        .context("stdio transport failed")?;

    Ok(())
}
