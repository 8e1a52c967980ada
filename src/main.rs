//! tcpeek - print kernel TCP statistics for an in-flight HTTP download

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tcpeek::snapshot::{tcp_stats, TcpStats};

/// Body prefix to pull before sampling, enough to leave the transfer in
/// flight on anything bigger than a trivial file.
const BODY_PREFIX_BYTES: usize = 256 * 1024;

#[derive(Parser)]
#[command(
    name = "tcpeek",
    version,
    about = "Print kernel TCP statistics for the socket behind an HTTP download"
)]
struct Args {
    /// URL to download; pick something large enough that the transfer is
    /// still in flight when the snapshot is taken
    url: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) -> Result<()> {
    let filter =
        EnvFilter::from_default_env().add_directive(format!("tcpeek={level}").parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let mut stream = tcpeek::http::fetch(&args.url).await?;

    // Pull a prefix of the body so the connection has live transfer state
    // to report.
    let mut remaining = BODY_PREFIX_BYTES;
    let mut chunk = [0u8; 16 * 1024];
    while remaining > 0 {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        remaining -= n.min(remaining);
    }
    debug!(
        "sampling after {} body bytes",
        BODY_PREFIX_BYTES - remaining
    );

    match tcp_stats(stream.as_ref())? {
        TcpStats::Stats(info) => println!("{}", serde_json::to_string_pretty(&info)?),
        TcpStats::NoSocket => println!("no socket could be resolved from the response stream"),
        TcpStats::Unavailable => println!("TCP statistics are unavailable for this connection"),
    }

    Ok(())
}
