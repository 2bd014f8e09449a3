// Command-line and environment configuration.
// Resolves directories, the dispatch timeout and the outbound header set.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::api::DEFAULT_TIMEOUT;
use crate::error::{HostError, Result};
use crate::paths;
use crate::settings::SettingsStore;

const DEFAULT_TIMEOUT_MS: u64 = DEFAULT_TIMEOUT.as_millis() as u64;

#[derive(Debug, Parser)]
#[command(name = "apihost", version, about = "Serve backend operations to a front-end over stdio")]
pub struct Cli {
    /// Directory holding cached resources
    #[arg(long, env = "APIHOST_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Settings document location
    #[arg(long, env = "APIHOST_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Milliseconds an operation may run before the peer gets a timeout
    #[arg(long, env = "APIHOST_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Header sent with every fetch, as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub cache_dir: PathBuf,
    pub settings_path: PathBuf,
    pub timeout: Duration,
    pub headers: HeaderMap,
}

impl Cli {
    pub fn into_config(self) -> Result<HostConfig> {
        let cache_dir = match self.cache_dir {
            Some(dir) => dir,
            None => paths::cache_dir().ok_or_else(|| {
                HostError::Config("no cache directory available, pass --cache-dir".to_string())
            })?,
        };

        if self.timeout_ms == 0 {
            return Err(HostError::Config("timeout must be positive".to_string()));
        }

        let mut headers = HeaderMap::new();
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            headers.append(name, value);
        }

        Ok(HostConfig {
            cache_dir,
            settings_path: self.settings.unwrap_or_else(SettingsStore::default_path),
            timeout: Duration::from_millis(self.timeout_ms),
            headers,
        })
    }
}

/// Parse a `Name: value` header line.
pub fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| HostError::Config(format!("header '{}' is not 'Name: value'", raw)))?;

    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| HostError::Config(format!("header name in '{}': {}", raw, e)))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| HostError::Config(format!("header value in '{}': {}", raw, e)))?;

    Ok((name, value))
}
