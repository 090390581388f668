//! Configuration for the logging facility

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default maximum size of a single log file in bytes (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 104_857_600;

/// Default maximum number of log files kept in the log directory
pub const DEFAULT_MAX_FILE_COUNT: usize = 10;

/// Smallest usable `max_file_size`; anything below falls back to the default
pub const MIN_FILE_SIZE: u64 = 4096;

/// Smallest usable `max_file_count`; anything below falls back to the default
pub const MIN_FILE_COUNT: usize = 2;

/// Logger configuration
///
/// All fields have defaults, so a partial TOML file (or none at all) is
/// fine. Consumers should go through [`Config::normalized`] so the size and
/// count floors are applied in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level: 2 = debug, 3 = error. Messages below the configured level
    /// are not written.
    #[serde(default = "default_level")]
    pub level: u8,

    /// Directory for log files (created on first write if missing)
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Name of the live log file; rotated files get a `.<N>` suffix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Maximum size of a single log file in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum number of log files kept in the directory (live file included)
    #[serde(default = "default_max_file_count")]
    pub max_file_count: usize,

    /// Tag each log line with the `file:line` of the call site
    #[serde(default = "default_include_caller")]
    pub include_caller: bool,
}

fn default_level() -> u8 {
    3 // error
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    "rollog.log".to_string()
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_file_count() -> usize {
    DEFAULT_MAX_FILE_COUNT
}

fn default_include_caller() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: default_log_dir(),
            file_prefix: default_file_prefix(),
            max_file_size: default_max_file_size(),
            max_file_count: default_max_file_count(),
            include_caller: default_include_caller(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or return the default if the
    /// file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Return a copy with the size and count floors applied.
    ///
    /// Values below the floor are replaced with the default, not clamped to
    /// the floor.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        if config.max_file_size < MIN_FILE_SIZE {
            config.max_file_size = DEFAULT_MAX_FILE_SIZE;
        }
        if config.max_file_count < MIN_FILE_COUNT {
            config.max_file_count = DEFAULT_MAX_FILE_COUNT;
        }
        config
    }
}
