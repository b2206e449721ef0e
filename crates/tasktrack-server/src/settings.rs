//! Layered settings loading.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `~/.tasktrack/settings.toml`
//! 3. An explicit file passed on the command line
//! 4. `TASKTRACK_*` environment variables, `__` separating sections
//!    (`TASKTRACK_SERVER__PORT` -> `server.port`)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tasktrack_telemetry::{parse_level, LogFormat, TelemetryConfig};

use crate::server::ServerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: tasktrack_dir().join("database").join("tasks.db"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub level: String,
    /// Module path to level, e.g. `tasktrack_store = "debug"`.
    pub modules: BTreeMap<String, String>,
    pub format: LogFormat,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            modules: BTreeMap::new(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetrySettings {
    pub fn to_config(&self) -> Result<TelemetryConfig, ConfigError> {
        let level = |field: String, raw: &str| {
            parse_level(raw).ok_or_else(|| ConfigError::InvalidValue {
                field,
                reason: format!("unknown log level '{raw}'"),
            })
        };

        let log_level = level("telemetry.level".into(), &self.level)?;
        let module_levels = self
            .modules
            .iter()
            .map(|(module, raw)| {
                Ok((
                    module.clone(),
                    level(format!("telemetry.modules.{module}"), raw)?,
                ))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(TelemetryConfig {
            log_level,
            module_levels,
            format: self.format,
        })
    }
}

impl Settings {
    pub fn load(extra: Option<&Path>) -> Result<Self, ConfigError> {
        Self::figment(extra).extract().map_err(ConfigError::from)
    }

    /// Build the provider chain. Public so tests can extract from it directly.
    pub fn figment(extra: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let global = tasktrack_dir().join("settings.toml");
        if global.exists() {
            figment = figment.merge(Toml::file(global));
        }

        // An explicit file must exist; `Toml::file` alone would skip it silently.
        if let Some(path) = extra {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment.merge(Env::prefixed("TASKTRACK_").split("__"))
    }
}

fn tasktrack_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".tasktrack")
}
