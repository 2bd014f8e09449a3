//! apihost entry point.
//!
//! Reads requests from stdin and writes replies to stdout, one JSON document
//! per line. Logs go to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use apihost::api::{Dispatcher, LocalBackend, transport};
use apihost::cache::ResourceCache;
use apihost::config::Cli;
use apihost::fetch::Fetcher;
use apihost::settings::SettingsStore;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> apihost::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.into_config()?;

    let fetcher = Fetcher::new(config.headers)?;
    let cache = ResourceCache::open(config.cache_dir, fetcher).await?;
    let settings = SettingsStore::new(config.settings_path);

    info!(
        cache = %cache.dir().display(),
        settings = %settings.path().display(),
        timeout_ms = config.timeout.as_millis() as u64,
        "apihost ready"
    );

    let backend = Arc::new(LocalBackend::new(cache, settings));
    let dispatcher = Dispatcher::new(backend).with_timeout(config.timeout);

    transport::run(dispatcher, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    info!("front-end closed the request stream");
    Ok(())
}

/// Log level from RUST_LOG, else 0 = warn, 1 = info, 2+ = debug.
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("apihost=warn"),
        1 => EnvFilter::new("apihost=info"),
        _ => EnvFilter::new("apihost=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
