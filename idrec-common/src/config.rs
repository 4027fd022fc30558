//! Bootstrap configuration loading
//!
//! Settings sources priority:
//! 1. Command-line arguments / environment variables (applied by the binary)
//! 2. TOML configuration file (explicit path, else the per-user config dir)
//! 3. Built-in defaults (code constants)
//!
//! A missing TOML file never stops startup: compiled defaults are used and
//! the returned [`ConfigSource`] says so, letting the binary log it once
//! tracing is up. A file that exists but cannot be parsed is a
//! configuration error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default HTTP port for idrec-identify
pub const DEFAULT_PORT: u16 = 5730;

/// Default upper bound on lock-retry time for a single identify call
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Platform-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_lock_wait_ms: u64,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            database_path: default_database_path(),
            host: default_host(),
            port: DEFAULT_PORT,
            log_level: default_log_level(),
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional in the file; absent keys take compiled defaults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Path to SQLite database file holding the `contacts` table
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Interface to bind the HTTP server to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Cluster resolution tuning
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Total time an identify call may spend re-running its unit of work
    /// after lock contention before giving up
    #[serde(default = "default_max_lock_wait_ms")]
    pub max_lock_wait_ms: u64,
}

impl Default for TomlConfig {
    fn default() -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        Self {
            database_path: defaults.database_path,
            host: defaults.host,
            port: defaults.port,
            logging: LoggingConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_lock_wait_ms: default_max_lock_wait_ms(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// `host:port` string suitable for `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Built-in defaults; carries the path that was looked for, if any
    Defaults { missing: Option<PathBuf> },
}

/// Load bootstrap configuration
///
/// `explicit` is the path given on the command line or via `IDREC_CONFIG`;
/// when absent the per-user config file is tried.
pub fn load_config(explicit: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let path = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => return Ok((TomlConfig::default(), ConfigSource::Defaults { missing: None })),
    };

    if !path.exists() {
        return Ok((
            TomlConfig::default(),
            ConfigSource::Defaults {
                missing: Some(path),
            },
        ));
    }

    let content = std::fs::read_to_string(&path)?;
    let config = TomlConfig::from_toml_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    Ok((config, ConfigSource::File(path)))
}

/// Per-user configuration file location (`<config_dir>/idrec/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("idrec").join("config.toml"))
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("idrec"))
        .unwrap_or_else(|| PathBuf::from("./idrec_data"))
        .join("contacts.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_lock_wait_ms() -> u64 {
    DEFAULT_MAX_LOCK_WAIT_MS
}
