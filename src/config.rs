//! Runtime configuration.
//!
//! Defaults, overridden by an optional `key = value` file, overridden by
//! `MACSWAP_*` environment variables. The binary applies CLI flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::MacAddress;
use crate::error::MacError;

/// Address reset falls back to when the live address can't be read at startup.
pub const DEFAULT_FALLBACK_MAC: [u8; 6] = [0x98, 0x8D, 0x46, 0xFB, 0x64, 0x45];

const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "warn";
const STATE_FILE_NAME: &str = "saved_mac.json";

#[cfg(windows)]
const DEFAULT_INTERFACE: &str = "Wi-Fi";
#[cfg(target_os = "macos")]
const DEFAULT_INTERFACE: &str = "en0";
#[cfg(not(any(windows, target_os = "macos")))]
const DEFAULT_INTERFACE: &str = "eth0";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Interface label every operation targets.
    pub interface: String,
    /// Default address used when the startup read fails.
    pub fallback_default: MacAddress,
    /// Where the last applied address is saved.
    pub state_file: PathBuf,
    /// Run Unix link commands through `sudo -n`.
    pub use_sudo: bool,
    /// Longest wait for any single external tool.
    pub command_timeout: Duration,
    /// Try to re-enable the interface when an apply fails after disabling it.
    pub restore_link_on_failure: bool,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            fallback_default: MacAddress::new(DEFAULT_FALLBACK_MAC),
            state_file: default_data_dir().join(STATE_FILE_NAME),
            use_sudo: false,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            restore_link_on_failure: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load from the config file named by `MACSWAP_CONFIG` (or the default
    /// location) and the environment.
    pub fn load() -> Result<Self, MacError> {
        let config_path = std::env::var("MACSWAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());

        let mut config = Config::default();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                MacError::Config(format!("Failed to read {}: {}", config_path.display(), e))
            })?;
            config.apply_file(&content)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Apply `key = value` lines; comments, blank lines and unknown keys are skipped.
    pub fn apply_file(&mut self, content: &str) -> Result<(), MacError> {
        for line in content.lines() {
            if let Some((key, value)) = parse_config_line(line) {
                self.set(key, value)?;
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), MacError> {
        const ENV_KEYS: &[(&str, &str)] = &[
            ("MACSWAP_INTERFACE", "interface"),
            ("MACSWAP_FALLBACK_MAC", "fallback_mac"),
            ("MACSWAP_STATE_FILE", "state_file"),
            ("MACSWAP_USE_SUDO", "use_sudo"),
            ("MACSWAP_TIMEOUT", "command_timeout"),
            ("MACSWAP_RESTORE_LINK", "restore_link_on_failure"),
            ("MACSWAP_LOG", "log_filter"),
        ];

        for (var, key) in ENV_KEYS {
            if let Ok(value) = std::env::var(var) {
                self.set(key, value.trim())?;
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), MacError> {
        match key {
            "interface" => {
                if value.is_empty() {
                    return Err(MacError::Config("interface must not be empty".to_string()));
                }
                self.interface = value.to_string();
            }
            "fallback_mac" => {
                self.fallback_default = MacAddress::normalize(value).map_err(|_| {
                    MacError::Config(format!("Invalid fallback_mac: {}", value))
                })?;
            }
            "state_file" => self.state_file = PathBuf::from(value),
            "use_sudo" => self.use_sudo = parse_bool(key, value)?,
            "command_timeout" => {
                let secs: u64 = value.parse().map_err(|_| {
                    MacError::Config(format!("Invalid command_timeout: {}", value))
                })?;
                if secs == 0 {
                    return Err(MacError::Config("command_timeout must be positive".to_string()));
                }
                self.command_timeout = Duration::from_secs(secs);
            }
            "restore_link_on_failure" => self.restore_link_on_failure = parse_bool(key, value)?,
            "log_filter" => self.log_filter = value.to_string(),
            _ => {}
        }
        Ok(())
    }
}

/// Parse a key=value line, skipping comments and empty lines.
fn parse_config_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, MacError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MacError::Config(format!("Invalid {}: {}", key, value))),
    }
}

fn default_config_path() -> PathBuf {
    if cfg!(windows) {
        std::env::var("PROGRAMDATA")
            .map(|dir| Path::new(&dir).join("macswap").join("macswap.conf"))
            .unwrap_or_else(|_| PathBuf::from("macswap.conf"))
    } else {
        PathBuf::from("/etc/macswap.conf")
    }
}

fn default_data_dir() -> PathBuf {
    if cfg!(windows) {
        if let Ok(dir) = std::env::var("APPDATA") {
            return Path::new(&dir).join("macswap");
        }
    } else {
        if let Ok(dir) = std::env::var("XDG_DATA_HOME") {
            return Path::new(&dir).join("macswap");
        }
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(".local").join("share").join("macswap");
        }
    }
    PathBuf::from(".")
}
