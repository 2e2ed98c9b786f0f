//! Logger configuration.
//!
//! Configuration can come from the environment (`LOG_LEVEL`, `LOG_FORMAT`)
//! or a JSON document. Applying a config is lenient in the same way the
//! setters are. `validate` is available for hosts that want to reject typos
//! at startup.

use std::collections::BTreeMap;
use std::env;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LoggerError, Result};
use crate::logging::format::Formatter;
use crate::logging::level::Level;
use crate::logging::logger::SharedLogger;
use crate::logging::sink::Sink;

pub const LEVEL_ENV: &str = "LOG_LEVEL";
pub const FORMAT_ENV: &str = "LOG_FORMAT";

fn default_level() -> String {
    Level::default().as_str().to_string()
}

fn default_format() -> String {
    Formatter::default().as_str().to_string()
}

/// Initial settings for a [`SharedLogger`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
    /// Extra fields added to the shared defaults.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            fields: BTreeMap::new(),
        }
    }
}

impl LoggerConfig {
    /// Read `LOG_LEVEL` and `LOG_FORMAT`; unset variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(LEVEL_ENV) {
            config.level = level;
        }
        if let Some(format) = lookup(FORMAT_ENV) {
            config.format = format;
        }
        config
    }

    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| LoggerError::InvalidConfig(e.to_string()))
    }

    /// Strictly check the level and format names.
    pub fn validate(&self) -> Result<()> {
        self.level.parse::<Level>()?;
        self.format.parse::<Formatter>()?;
        Ok(())
    }

    pub fn level(&self) -> Level {
        Level::parse_lenient(&self.level)
    }

    pub fn formatter(&self) -> Formatter {
        Formatter::from_name(&self.format)
    }
}

impl SharedLogger {
    /// Build a logger writing to standard output from `config`.
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::from_config_with_sink(config, Sink::stdout())
    }

    pub fn from_config_with_sink(config: &LoggerConfig, sink: impl Into<Sink>) -> Self {
        let logger = Self::with_sink(sink);
        logger.apply_config(config);
        logger
    }

    /// Apply level, format and fields from `config` to this logger.
    pub fn apply_config(&self, config: &LoggerConfig) {
        self.set_level_value(config.level());
        self.set_formatter_value(config.formatter());
        if !config.fields.is_empty() {
            self.add_fields(config.fields.clone());
        }
    }
}
