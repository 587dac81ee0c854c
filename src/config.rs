// Configuration parsing.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Locations tried, in order, when no explicit path is given.
pub const SEARCH_PATHS: &[&str] = &[
    "/usr/local/etc/dialmux.toml",
    "/etc/dialmux.toml",
    "dialmux.toml",
];

const DEFAULT_PORT: u16 = 6543;
const DEFAULT_PERIOD_SECS: u64 = 5;
const DEFAULT_STALE_TIMEOUT_SECS: u64 = 30;

/// Top-level daemon configuration.
///
/// Only `[commands]` is required; the server and sweeper sections fall
/// back to defaults when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub commands: Commands,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sweeper: SweeperConfig,
}

/// The three external commands actuating the link. Each must return
/// promptly; the probe command's zero exit status means "link up".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commands {
    pub dial: String,
    pub hangup: String,
    pub probe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweeps.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Seconds a lease may go unrefreshed before eviction.
    #[serde(default = "default_stale_timeout_secs")]
    pub stale_timeout_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_PERIOD_SECS,
            stale_timeout_secs: DEFAULT_STALE_TIMEOUT_SECS,
        }
    }
}

impl SweeperConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn stale_timeout(&self) -> Duration {
        Duration::from_secs(self.stale_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from the first existing file in [`SEARCH_PATHS`].
    pub fn discover() -> Result<Self> {
        for candidate in SEARCH_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Err(Error::ConfigNotFound)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_period_secs() -> u64 {
    DEFAULT_PERIOD_SECS
}

fn default_stale_timeout_secs() -> u64 {
    DEFAULT_STALE_TIMEOUT_SECS
}
