use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::sync::ListingFailurePolicy;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Console/file level when neither `-v` nor `RUST_LOG` is given.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Log file path [default: <tmp dir>/cloudsync.log]
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_max_bytes")]
    pub log_max_bytes: u64,
    #[serde(default = "default_log_backups")]
    pub log_backups: usize,
    #[serde(default)]
    pub on_listing_failure: ListingFailurePolicy,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            log_file: None,
            log_max_bytes: default_log_max_bytes(),
            log_backups: default_log_backups(),
            on_listing_failure: ListingFailurePolicy::default(),
        }
    }
}

fn default_log_max_bytes() -> u64 {
    1024 * 1024
}
fn default_log_backups() -> usize {
    3
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Only files modified less than this many days ago take part.
    pub match_days: Option<u32>,
    /// Only files smaller than this take part.
    pub max_size_bytes: Option<u64>,
    /// Extra base-name masks (`*`, `?`) to leave out.
    #[serde(default)]
    pub exclude: Vec<String>,
}

pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(dir.join("cloudsync").join("config.toml"))
}

/// Load the config file. An explicit path must exist; the default path is
/// optional and yields the built-in defaults when absent.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Ok(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    if config.general.log_backups == 0 {
        anyhow::bail!("general.log_backups must be at least 1");
    }
    if config.filter.match_days == Some(0) {
        anyhow::bail!("filter.match_days must be at least 1");
    }

    Ok(config)
}
