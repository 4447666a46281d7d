//! Configuration loading for the relay
//!
//! Resolution order, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable (both handled by the binary's clap parser and passed
//!    in as [`ConfigOverrides`])
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error; defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_DEVICE_URL: &str = "http://192.168.68.110";
pub const DEFAULT_DEVICE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const STATUS_FILE_NAME: &str = "device_status.txt";
pub const LEDGER_FILE_NAME: &str = "attendance_log.csv";
pub const INBOX_FILE_NAME: &str = "device_inbox.log";

/// Config file as written by the operator; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub bind_addr: Option<String>,

    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub device: DeviceSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[device]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceSection {
    /// Base URL of the device, e.g. `http://192.168.68.110`
    #[serde(default)]
    pub url: Option<String>,

    /// Upper bound on one relay call
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// `[logging]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    #[serde(default)]
    pub level: Option<String>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub device_url: Option<String>,
    pub device_timeout_ms: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: String,
    /// Device base URL without trailing slash
    pub device_url: String,
    pub device_timeout: Duration,
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl RelayConfig {
    /// Merge overrides, file and defaults, then validate
    pub fn resolve(overrides: ConfigOverrides, file: Option<TomlConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let device_url = overrides
            .device_url
            .or(file.device.url)
            .unwrap_or_else(|| DEFAULT_DEVICE_URL.to_string());
        let device_url = normalize_device_url(&device_url)?;

        let timeout_ms = overrides
            .device_timeout_ms
            .or(file.device.timeout_ms)
            .unwrap_or(DEFAULT_DEVICE_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(Error::Config(
                "device timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_addr: overrides
                .bind_addr
                .or(file.bind_addr)
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            device_url,
            device_timeout: Duration::from_millis(timeout_ms),
            data_dir: overrides
                .data_dir
                .or(file.data_dir)
                .unwrap_or_else(default_data_dir),
            log_level: overrides
                .log_level
                .or(file.logging.level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    pub fn status_path(&self) -> PathBuf {
        self.data_dir.join(STATUS_FILE_NAME)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE_NAME)
    }

    pub fn inbox_path(&self) -> PathBuf {
        self.data_dir.join(INBOX_FILE_NAME)
    }

    /// Create the data directory if missing
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .map_err(|e| Error::from_write(e, &self.data_dir))?;
            info!("Created data directory: {}", self.data_dir.display());
        }
        Ok(())
    }
}

fn normalize_device_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| {
            Error::Config(format!(
                "device url must start with http:// or https://, got {:?}",
                url
            ))
        })?;

    if host.trim_end_matches('/').is_empty() {
        return Err(Error::Config(format!("device url has no host: {:?}", url)));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Platform config file location: `<config_dir>/fpb/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fpb").join("config.toml"))
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fpb"))
        .unwrap_or_else(|| PathBuf::from("./fpb_data"))
}

/// Parse a TOML config file
pub fn load_toml(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("invalid TOML in {}: {}", path.display(), e)))
}

/// Load the config file.
///
/// An explicit path must exist. Without one, the platform default is used when
/// present; otherwise `None` and defaults apply.
pub fn load_config_file(explicit: Option<&Path>) -> Result<Option<TomlConfig>> {
    if let Some(path) = explicit {
        return load_toml(path).map(Some);
    }

    match default_config_path() {
        Some(path) if path.exists() => load_toml(&path).map(Some),
        _ => Ok(None),
    }
}
