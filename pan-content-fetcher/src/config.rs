use std::fs;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::error::FetcherError;

/// Support account credentials and download location, loaded from a flat
/// TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    pub username: String,
    pub password: String,

    /// Where downloaded packages land. Defaults to the current working
    /// directory when unset.
    #[serde(default, alias = "filedir")]
    pub download_dir: Option<PathBuf>,
}

impl FetcherConfig {
    pub fn load(path: &Path) -> Result<Self, FetcherError> {
        let data = fs::read_to_string(path)?;
        Ok(toml::from_str(&data)?)
    }

    pub fn resolve_download_dir(&self) -> Result<PathBuf, FetcherError> {
        match &self.download_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}
