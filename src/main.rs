//! Main entry point for the csv-feed-uploader CLI.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use csv_feed_uploader::config::Config;
use csv_feed_uploader::shutdown::ShutdownLatch;
use csv_feed_uploader::store::HttpFeedClient;
use csv_feed_uploader::uploader::{Scheduler, UploadCycle};
use csv_feed_uploader::CycleOutcome;

/// Incrementally uploads new CSV rows to a remote time-series feed store.
#[derive(Debug, Parser)]
#[command(name = "csv-feed-uploader", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "UPLOADER_CONFIG", default_value = "uploader.toml")]
    config: PathBuf,

    /// Run a single upload cycle and exit, overriding upload.continuous
    #[arg(long)]
    once: bool,
}

/// Initialize the tracing subscriber, with optional JSON output via
/// `LOG_FORMAT=json`.
fn init_tracing() {
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("csv_feed_uploader=info")),
    );

    match std::env::var("LOG_FORMAT") {
        Ok(format) if format.eq_ignore_ascii_case("json") => builder.json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e:#}");
            std::process::exit(1);
        }
    };
    if cli.once {
        config.upload.continuous = false;
    }

    let shutdown = ShutdownLatch::new();
    shutdown.trigger_on_ctrl_c();

    let store = match HttpFeedClient::new(&config.store) {
        Ok(store) => store,
        Err(e) => {
            error!("failed to build store client: {e}");
            std::process::exit(1);
        }
    };

    info!(
        path = %config.csv_path().display(),
        continuous = config.upload.continuous,
        "uploader starting"
    );

    let cycle = UploadCycle::new(&config, store);
    let outcome = Scheduler::new(cycle, &config.upload)
        .with_shutdown(shutdown)
        .run()
        .await;

    if let CycleOutcome::Failed(e) = outcome {
        error!("upload failed: {e}");
        std::process::exit(1);
    }
}
