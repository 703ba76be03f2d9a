use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rtlbridge::sink::LogSinkFactory;
use rtlbridge::Config;
use rtlbridge::Platform;
use rtlbridge::Termination;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Bridge rtl_433 sensor readings into accessory state
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(default_value = "rtlbridge.toml")]
    config: PathBuf,

    /// Validate the configuration, print the accessories and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.targets())
        .init();

    tracing::info!("rtlbridge starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let platform = Platform::new(&config, &LogSinkFactory);

    if args.check {
        for summary in platform.summaries() {
            println!("{} ({})", summary.name, summary.serial_number);
            for service in summary.services {
                println!("  {}: {}", service.kind, service.display_name);
            }
        }
        return Ok(());
    }

    let (accessories, handle) = platform.accessories();
    for accessory in &accessories {
        tracing::info!("Accessory: {} ({})", accessory.name, accessory.serial_number);
    }

    tracing::info!("Press Ctrl+C to exit");

    // A dead decoder does not stop the bridge; readings simply stop arriving.
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received shutdown signal");
        }
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    match handle.shutdown().await {
        Termination::Cancelled(_) => {}
        Termination::Exited(status) => {
            tracing::warn!("Decoder had already exited: {}", status);
        }
        Termination::Failed(e) => {
            tracing::warn!("Decoder had failed: {}", e);
        }
    }

    tracing::info!("rtlbridge shutdown complete");

    Ok(())
}
