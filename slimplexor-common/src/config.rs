//! Configuration loading and config file resolution
//!
//! The configuration is loaded once at start-up and handed to the engine as
//! plain values. Nothing in here is global or mutable after load.
//!
//! # Config File Priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `SLIMPLEXOR_CONFIG` environment variable
//! 3. `<user config dir>/slimplexor/config.toml`
//! 4. `/etc/slimplexor/config.toml`
//! 5. Compiled defaults (fallback, logged as a warning)
//!
//! An explicitly named file (levels 1 and 2) must exist. The discovered
//! locations (levels 3 and 4) are only used when present.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "SLIMPLEXOR_CONFIG";

/// One row of the rate→device table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateDeviceEntry {
    /// Sample rate in Hz
    pub rate: u32,

    /// Destination device identifier (e.g. `hw:2,0,1`)
    #[serde(alias = "device_id")]
    pub device: String,
}

impl RateDeviceEntry {
    pub fn new(rate: u32, device: impl Into<String>) -> Self {
        Self {
            rate,
            device: device.into(),
        }
    }
}

/// Logging verbosity accepted in the configuration file
///
/// Parsed case-insensitively. `warning` and `warn` are both accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    None,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Maximum tracing level enabled by this setting
    pub fn as_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(LogLevel::None),
            "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(Error::InvalidInput(format!(
                "Unknown log level '{}' (expected none, error, warning, info, debug or trace)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (none, error, warning, info, debug, trace)
    #[serde(default)]
    pub level: LogLevel,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Complete configuration file model
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Raw source PCM is appended here when set
    #[serde(default)]
    pub dump_file: Option<PathBuf>,

    /// Rate→device table; empty means "use the compiled default table"
    #[serde(default, rename = "rate_device")]
    pub rate_devices: Vec<RateDeviceEntry>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            dump_file: None,
            rate_devices: default_rate_table(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate configuration text
    ///
    /// An empty rate table is replaced with [`default_rate_table`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: TomlConfig = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        if config.rate_devices.is_empty() {
            info!("No rate_device entries configured, using compiled default table");
            config.rate_devices = default_rate_table();
        }

        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check the rate table
    ///
    /// Rates must be non-zero and devices non-empty. Duplicate rates are
    /// allowed (first entry wins on lookup) but logged.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (index, entry) in self.rate_devices.iter().enumerate() {
            if entry.rate == 0 {
                return Err(Error::Config(format!(
                    "rate_device[{}]: rate must be greater than zero",
                    index
                )));
            }
            if entry.device.trim().is_empty() {
                return Err(Error::Config(format!(
                    "rate_device[{}]: device for rate {} is empty",
                    index, entry.rate
                )));
            }
            if !seen.insert(entry.rate) {
                warn!(
                    "rate_device[{}]: rate {} is listed more than once, only the first entry is used",
                    index, entry.rate
                );
            }
        }

        Ok(())
    }
}

/// Rate→device table used when the configuration names none
///
/// Low rates go to the first card, high rates to the second; one
/// subdevice per rate.
pub fn default_rate_table() -> Vec<RateDeviceEntry> {
    vec![
        RateDeviceEntry::new(8000, "hw:1,0,1"),
        RateDeviceEntry::new(11025, "hw:1,0,2"),
        RateDeviceEntry::new(12000, "hw:1,0,3"),
        RateDeviceEntry::new(16000, "hw:1,0,4"),
        RateDeviceEntry::new(22500, "hw:1,0,5"),
        RateDeviceEntry::new(24000, "hw:1,0,6"),
        RateDeviceEntry::new(32000, "hw:1,0,7"),
        RateDeviceEntry::new(44100, "hw:2,0,1"),
        RateDeviceEntry::new(48000, "hw:2,0,2"),
        RateDeviceEntry::new(88200, "hw:2,0,3"),
        RateDeviceEntry::new(96000, "hw:2,0,4"),
        RateDeviceEntry::new(176400, "hw:2,0,5"),
        RateDeviceEntry::new(192000, "hw:2,0,6"),
    ]
}

/// Find the configuration file to load, following the priority order above
///
/// Returns `None` when nothing was named explicitly and no default
/// location holds a file.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3 and 4: discovered locations
    default_config_locations().into_iter().find(|p| p.exists())
}

/// Platform config file locations, user first
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("slimplexor").join("config.toml"));
    }
    if cfg!(unix) {
        locations.push(PathBuf::from("/etc/slimplexor/config.toml"));
    }
    locations
}

/// Resolve and load the configuration
///
/// Falls back to compiled defaults when no file is found.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => TomlConfig::load(&path),
        None => {
            warn!("No configuration file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}
