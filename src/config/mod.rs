//! Configuration loading and resolution.
//!
//! Defaults, then `~/.devcam/config.toml` (or `--config`), then environment
//! and command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::camera::{CAMERA_WS_PATH, DEFAULT_FRAME_INTERVAL};

pub const DEFAULT_CONFIG_PATH: &str = "~/.devcam/config.toml";
pub const DEFAULT_LOG_PATH: &str = "~/.devcam/devcam.log";
/// Address of the device's own access point
pub const DEFAULT_HOST: &str = "192.168.4.1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("frame_interval_ms must be greater than zero")]
    ZeroInterval,
    #[error("device host is empty")]
    EmptyHost,
}

/// Config file schema; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Device host[:port]
    pub host: Option<String>,
    /// Use wss/https instead of ws/http
    pub tls: Option<bool>,
    /// Bearer token for privileged API calls
    pub token: Option<String>,
    /// Pause between capture commands while streaming
    pub frame_interval_ms: Option<u64>,
    /// Where single-shot captures are saved
    pub capture_dir: Option<String>,
    /// Log file used while the terminal UI is running
    pub log_file: Option<String>,
}

impl FileConfig {
    /// A missing file is an empty config
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub tls: bool,
    pub token: Option<String>,
    pub frame_interval_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub tls: bool,
    pub token: Option<String>,
    pub frame_interval: Duration,
    pub capture_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Config {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let host = overrides
            .host
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host.trim().trim_end_matches('/').to_string();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let frame_interval = match overrides.frame_interval_ms.or(file.frame_interval_ms) {
            Some(0) => return Err(ConfigError::ZeroInterval),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_FRAME_INTERVAL,
        };

        Ok(Self {
            host,
            tls: overrides.tls || file.tls.unwrap_or(false),
            token: overrides.token.or(file.token),
            frame_interval,
            capture_dir: expand_path(file.capture_dir.as_deref().unwrap_or(".")),
            log_file: expand_path(file.log_file.as_deref().unwrap_or(DEFAULT_LOG_PATH)),
        })
    }

    pub fn ws_url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{}://{}{}", scheme, self.host, CAMERA_WS_PATH)
    }

    pub fn http_base(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}", scheme, self.host)
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            let mut buf = PathBuf::from(home);
            buf.push(stripped);
            return buf;
        }
    }
    PathBuf::from(path)
}
