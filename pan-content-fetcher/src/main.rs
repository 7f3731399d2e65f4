mod error;
mod args;
mod config;
mod session;
mod portal;
mod resolve;
mod inventory;
mod fetch;

use clap::Parser as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use crate::args::FetcherArgs;
use crate::error::FetcherError;
use crate::fetch::{ContentFetcher, FetchOutcome};

fn main() {
    let args = FetcherArgs::parse();

    let indicatif_layer = tracing_indicatif::IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(log_filter(&args))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stdout_writer()))
        .with(indicatif_layer)
        .init();

    let result = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build() {
        Ok(v) => v.block_on(async_main(args)),
        Err(err) => {
            tracing::error!("Failed to create tokio runtime: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        tracing::error!("Error: {:?}", err);
        std::process::exit(1);
    }
}

/// Map the verbosity flag onto a log filter, letting the environment
/// variable win when it is set.
fn log_filter(args: &FetcherArgs) -> tracing_subscriber::EnvFilter {
    if std::env::var("PAN_FETCHER_LOG").is_ok() {
        return tracing_subscriber::EnvFilter::from_env("PAN_FETCHER_LOG");
    }

    let directives = match args.verbose {
        0 => "error",
        1 => "info",
        _ => "debug,reqwest=trace,hyper_util=trace",
    };

    tracing_subscriber::EnvFilter::new(directives)
}

async fn async_main(args: FetcherArgs) -> Result<(), FetcherError> {
    tracing::trace!("args = {:#?}", args);

    let config = config::FetcherConfig::load(&args.config)?;
    let fetcher = ContentFetcher::new(&config, &args)?;

    match fetcher.run().await? {
        FetchOutcome::AlreadyCurrent(file_name) => {
            tracing::info!("Already downloaded latest version: {}", file_name);
        }
        FetchOutcome::Downloaded(file_name) => {
            tracing::info!("Finished downloading file: {}", file_name);
        }
    }

    Ok(())
}
