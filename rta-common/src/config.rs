//! Configuration loading for RTA services
//!
//! Bootstrap configuration comes from a TOML file. Every field carries a
//! built-in default, so a missing file is never fatal:
//! 1. Command-line argument / environment variable (applied by the binary)
//! 2. TOML config file
//! 3. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RTA_CONFIG";

/// Screening service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// HTTP server port
    pub port: u16,

    /// Path to SQLite database file (sqlite backend only)
    pub database_path: PathBuf,

    /// Storage backend selected at startup
    pub storage: StorageBackend,

    /// Upper bound on a whole screening request
    pub request_timeout_ms: u64,

    /// Duplicate matching thresholds
    pub thresholds: MatchThresholds,

    /// Whether the length-only admissibility gate filters candidates
    pub length_prefilter: bool,

    /// Maximum number of candidates sent to the metrics worker at once
    pub max_batch_size: usize,

    /// Tie-break among equally supported response groups
    pub tie_break: TieBreak,

    /// Metrics worker settings
    pub worker: WorkerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: PathBuf::from("./rta_data/rta.db"),
            storage: StorageBackend::Sqlite,
            request_timeout_ms: 12_000,
            thresholds: MatchThresholds::default(),
            length_prefilter: true,
            max_batch_size: 500,
            tie_break: TieBreak::LowestGroup,
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ScreenConfig {
    /// Reject values the matching pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::Config("max_batch_size must be at least 1".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be positive".to_string()));
        }
        let t = &self.thresholds;
        if !(0.0..=1.0).contains(&t.norm_lev) || !(0.0..=1.0).contains(&t.norm_lcs) {
            return Err(Error::Config(format!(
                "normalized thresholds must be within [0, 1] (norm_lev={}, norm_lcs={})",
                t.norm_lev, t.norm_lcs
            )));
        }
        Ok(())
    }
}

/// Duplicate matching thresholds
///
/// The same four values drive both the length-only admissibility gate and
/// the exact classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    /// Normalized edit distance below which two answers match
    pub norm_lev: f64,
    /// Raw edit distance below which two (longer than 5 chars) answers match
    pub raw_lev: usize,
    /// Normalized common-substring ratio at or above which answers match
    pub norm_lcs: f64,
    /// Common-substring length at or above which answers match
    pub raw_lcs: usize,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            norm_lev: 0.175,
            raw_lev: 2,
            norm_lcs: 0.9,
            raw_lcs: 100,
        }
    }
}

/// Storage backend for historical responses and group counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable SQLite database
    Sqlite,
    /// Process-local maps (local development, tests)
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

/// Tie-break applied when several groups share the highest vote count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Smallest group id wins
    LowestGroup,
    /// Group whose first vote appears earliest in candidate order wins
    FirstSeen,
}

/// Metrics worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Remote worker endpoint; metrics are computed in-process when absent
    pub url: Option<String>,
    /// Per-batch HTTP timeout
    pub timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 10_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,rta_screen=debug".to_string(),
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<ScreenConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: ScreenConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Default config file location for the platform
///
/// `~/.config/rta/rta-screen.toml` first, then `/etc/rta/rta-screen.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("rta").join("rta-screen.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/rta/rta-screen.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Where the resolved configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path given on the command line
    CommandLine(PathBuf),
    /// Path named by `RTA_CONFIG`
    Environment(PathBuf),
    /// Platform default location
    PlatformDefault(PathBuf),
    /// No file found; compiled defaults
    BuiltInDefaults,
}

impl ConfigSource {
    /// Config file path, if a file was used
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(path)
            | ConfigSource::Environment(path)
            | ConfigSource::PlatformDefault(path) => Some(path),
            ConfigSource::BuiltInDefaults => None,
        }
    }

    /// Log the configuration source
    ///
    /// Called by the binary once its subscriber is installed, since
    /// resolution itself runs before logging is configured.
    pub fn log(&self) {
        match self {
            ConfigSource::CommandLine(path) | ConfigSource::PlatformDefault(path) => {
                info!("Loaded configuration from {}", path.display());
            }
            ConfigSource::Environment(path) => {
                info!("Loaded configuration from {} ({})", path.display(), CONFIG_ENV_VAR);
            }
            ConfigSource::BuiltInDefaults => {
                warn!("No configuration file found, using built-in defaults");
            }
        }
    }
}

/// Resolve the service configuration
///
/// **Priority:** explicit path → `RTA_CONFIG` → platform default location → defaults.
/// An explicitly named file must exist and parse; a missing default file
/// falls back to compiled defaults (`ConfigSource::BuiltInDefaults`).
pub fn resolve_config(cli_path: Option<&Path>) -> Result<(ScreenConfig, ConfigSource)> {
    let source = if let Some(path) = cli_path {
        ConfigSource::CommandLine(path.to_path_buf())
    } else if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        ConfigSource::Environment(PathBuf::from(path))
    } else if let Some(path) = default_config_path() {
        ConfigSource::PlatformDefault(path)
    } else {
        ConfigSource::BuiltInDefaults
    };

    let config = match source.path() {
        Some(path) => load_toml_config(path)?,
        None => ScreenConfig::default(),
    };
    Ok((config, source))
}
