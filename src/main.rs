use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use metrelay::config::RelayConfig;
use metrelay::registry::build_relay;

#[derive(Parser, Debug)]
#[command(name = "metrelay")]
#[command(about = "Polls monitoring systems and relays metric snapshots to MQTT, NATS, files or sockets")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "metrelay.toml")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(
        short,
        long,
        default_value = "metrelay=info,metrelay_sdk=info,metrelay_adapters=info"
    )]
    log_level: String,

    /// Poll every source once, publish, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = RelayConfig::load(&args.config)?;
    let mut relay = build_relay(&config).await?;

    info!(
        config = %args.config.display(),
        sources = relay.source_count(),
        destinations = relay.destination_count(),
        "metrelay starting"
    );

    if args.once {
        let report = relay.tick().await;
        info!(
            polled = report.polled,
            poll_failures = report.poll_failures,
            published = report.published,
            publish_failures = report.publish_failures,
            "Single pass complete"
        );
        let close_failures = relay.close().await;
        if report.poll_failures + report.publish_failures + close_failures > 0 {
            anyhow::bail!("single pass finished with failures");
        }
        return Ok(());
    }

    relay
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for ctrl-c; stopping");
            }
        })
        .await;

    Ok(())
}
