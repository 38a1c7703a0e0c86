//! Configuration file model and lookup
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in defaults (fallback)
//!
//! This module owns tiers 3 and 4. Tiers 1 and 2 are applied by the binary,
//! which knows its own flags.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "JMUSE_CONFIG";

/// Score service root; the page, script and API URLs all live under it
pub const DEFAULT_API_BASE_URL: &str = "https://musescore.com";

/// The service rejects obviously scripted clients, so a browser string is sent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Seed last observed in the service's client bundle.
///
/// Only used by the constant seed strategy. The service rotates it without
/// notice, so it is a default and not a guarantee.
pub const DEFAULT_FALLBACK_SEED: &str = ")82";

/// How the per-run encryption seed is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedStrategy {
    /// Scan the score page's preloaded scripts for the seed literal
    #[default]
    Discover,
    /// Use a configured value without touching the network
    Constant,
}

impl fmt::Display for SeedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedStrategy::Discover => write!(f, "discover"),
            SeedStrategy::Constant => write!(f, "constant"),
        }
    }
}

impl FromStr for SeedStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discover" => Ok(SeedStrategy::Discover),
            "constant" => Ok(SeedStrategy::Constant),
            other => Err(format!(
                "unknown seed strategy '{}' (expected 'discover' or 'constant')",
                other
            )),
        }
    }
}

/// Configuration loaded from TOML file
///
/// Every field is optional; anything left out falls back to the built-in
/// defaults above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Score service root URL
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// User-Agent header sent with every request
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Parent folder for per-score output folders (default: current directory)
    #[serde(default)]
    pub output_root: Option<PathBuf>,

    /// Seed acquisition settings
    #[serde(default)]
    pub seed: SeedConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Seed acquisition configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub strategy: SeedStrategy,

    /// Seed used by the constant strategy
    #[serde(default)]
    pub value: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    // Progress goes to stdout; diagnostics stay quiet unless asked for
    "warn".to_string()
}

/// Platform config file location: `<config dir>/jmuse/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jmuse").join("config.toml"))
}

/// Pick the config file to read
///
/// Explicit path beats `$JMUSE_CONFIG`, which beats the platform default.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load config, falling back to defaults when no file exists
///
/// A missing file is not an error. A file that exists but does not parse is.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        debug!("No config file location available, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let config = load_toml_config(path)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write config to `path` atomically (temp file + rename)
///
/// Parent directories are created as needed.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;

    if let Err(e) = std::fs::rename(&temp_path, path) {
        warn!("Rename of {} failed: {}", temp_path.display(), e);
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    Ok(())
}
