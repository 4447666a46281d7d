//! Command-line arguments for fpb-relay
//!
//! Every flag can also come from the environment; both beat the TOML file.

use clap::Parser;
use fpb_common::config::{load_config_file, ConfigOverrides, RelayConfig};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "fpb-relay")]
#[command(about = "Relay between the fingerprint dashboard and the biometric device")]
#[command(version)]
pub struct Args {
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long, env = "FPB_BIND")]
    pub bind: Option<String>,

    /// Device base URL, e.g. http://192.168.68.110
    #[arg(long, env = "FPB_DEVICE_URL")]
    pub device_url: Option<String>,

    /// Upper bound on one relayed device call, in milliseconds
    #[arg(long, env = "FPB_DEVICE_TIMEOUT_MS")]
    pub device_timeout_ms: Option<u64>,

    /// Directory holding the status slot, attendance ledger and inbox log
    #[arg(short, long, env = "FPB_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// TOML config file (default: <config dir>/fpb/config.toml if present)
    #[arg(short, long, env = "FPB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "FPB_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_addr: self.bind.clone(),
            device_url: self.device_url.clone(),
            device_timeout_ms: self.device_timeout_ms,
            data_dir: self.data_dir.clone(),
            log_level: self.log_level.clone(),
        }
    }

    /// Resolve the full configuration: flags/env, then file, then defaults
    pub fn load_config(&self) -> fpb_common::Result<RelayConfig> {
        let file = load_config_file(self.config.as_deref())?;
        RelayConfig::resolve(self.overrides(), file)
    }
}
