//! Generator configuration types

use crate::LogLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
}

/// Settings for one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Treat every node without an explicit nullable flag as nullable
    ///
    /// An explicit `x-nullable`/`nullable` on a node always wins over this.
    #[serde(default)]
    pub treat_as_nullable: bool,

    /// Largest `maxItems` an array schema may declare
    #[serde(default = "default_max_array_length")]
    pub max_array_length: u64,

    /// Emit test scaffolding declarations
    #[serde(default = "default_generate_tests")]
    pub generate_tests: bool,

    /// Suffix appended to channel names to form client type names
    #[serde(default = "default_client_suffix")]
    pub client_suffix: String,

    /// Crate path the rendered clients import the runtime from
    #[serde(default = "default_runtime_crate")]
    pub runtime_crate: String,

    /// Initial log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_array_length() -> u64 {
    i32::MAX as u64
}

fn default_generate_tests() -> bool {
    true
}

fn default_client_suffix() -> String {
    "Client".to_string()
}

fn default_runtime_crate() -> String {
    "channelgen_runtime".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            treat_as_nullable: false,
            max_array_length: default_max_array_length(),
            generate_tests: default_generate_tests(),
            client_suffix: default_client_suffix(),
            runtime_crate: default_runtime_crate(),
            log_level: default_log_level(),
        }
    }
}

impl GeneratorConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from JSON bytes
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Create configuration from a TOML document such as `channelgen.toml`
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_treat_as_nullable(mut self, enabled: bool) -> Self {
        self.treat_as_nullable = enabled;
        self
    }

    pub fn with_max_array_length(mut self, limit: u64) -> Self {
        self.max_array_length = limit;
        self
    }

    /// Parsed log level
    pub fn level(&self) -> Result<LogLevel, ConfigError> {
        LogLevel::parse(&self.log_level)
            .ok_or_else(|| ConfigError::UnknownLogLevel(self.log_level.clone()))
    }
}


#[cfg(test)]
#[path = "config/config_parameterized_tests.rs"]
mod config_parameterized_tests;
