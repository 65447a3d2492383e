use std::{env, fmt, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(std::io::Error),
    #[error("failed to write config file: {0}")]
    Write(std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no config path available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: Storage,
    pub monitoring: Monitoring,
    /// Credentials for the SMS alert gateway; alerts are only logged when
    /// this section is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<SmsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self { storage: Storage::default(), monitoring: Monitoring::default(), sms: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    /// Base directory for record storage (one subdirectory per category).
    pub data_dir: path::PathBuf,
    /// Directory for per-check audit logs and their archives.
    pub log_dir: path::PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self { data_dir: ".data".into(), log_dir: ".logs".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitoring {
    pub probe_interval_seconds: u64,
    pub rotation_interval_seconds: u64,
    /// Serialize per-check updates across overlapping sweeps. The default
    /// keeps the original last-write-wins behavior.
    pub serialize_checks: bool,
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            probe_interval_seconds: 60,
            rotation_interval_seconds: 24 * 3600,
            serialize_checks: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/vigil/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("vigil/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Internal Configuration State:")?;
        writeln!(f, "  Storage")?;
        writeln!(f, "    Data Directory: {}", self.storage.data_dir.display())?;
        writeln!(f, "    Log Directory: {}", self.storage.log_dir.display())?;
        writeln!(f, "  Monitoring")?;
        writeln!(f, "    Probe Interval: {}s", self.monitoring.probe_interval_seconds)?;
        writeln!(f, "    Rotation Interval: {}s", self.monitoring.rotation_interval_seconds)?;
        writeln!(f, "    Serialize Checks: {}", self.monitoring.serialize_checks)?;
        writeln!(f, "  Sms Gateway: {}", if self.sms.is_some() { "configured" } else { "disabled" })?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/vigil/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = std::fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }

        std::fs::write(path, config_str).map_err(ConfigError::Write)
    }
}
