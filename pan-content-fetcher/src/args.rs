use std::path::PathBuf;
use clap::Parser;
use crate::portal::ListingSource;

#[derive(Debug, Clone, Parser)]
pub struct FetcherArgs {
    /// TOML file holding the support account credentials.
    #[arg(short, long, default_value = "content_fetcher.toml", env = "PAN_FETCHER_CONFIG")]
    pub config: PathBuf,

    /// Options: appthreat, app, antivirus, wildfire (for PAN-OS 7.0 and
    /// lower), wildfire2 (for PAN-OS 7.1 and higher), wf500, traps,
    /// clientless.
    #[arg(short, long, default_value = "appthreat")]
    pub package: String,

    #[arg(long, value_enum, default_value_t = ListingSource::Feed)]
    pub source: ListingSource,

    #[arg(long, default_value = "cookies.json", env = "PAN_FETCHER_COOKIE_FILE")]
    pub cookie_file: PathBuf,

    /// Per-request timeout in seconds.
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Verbose (-vv for extra verbose with HTTP client tracing).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
