//! Configuration for the SensorThings engine.
//!
//! Configuration is read from TOML. Every table and key is optional; missing
//! values fall back to the defaults documented on each field. Loading always
//! validates, so a `Config` in hand is safe to build runtime settings from.


use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Default nesting limit for `$expand` option trees.
pub const DEFAULT_MAX_EXPAND_DEPTH: usize = 5;

/// Default page size applied when a request carries no `$top`.
pub const DEFAULT_TOP: u64 = 100;

/// Default upper bound for a client-supplied `$top`.
pub const DEFAULT_MAX_TOP: u64 = 10_000;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{key}': {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

///
/// Config
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub service: ServiceConfig,
    pub query: QueryConfig,
    pub extensions: ExtensionConfig,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.query.validate()?;

        Ok(())
    }
}

///
/// ServiceConfig
/// Public addressing of the service, used for self links and topic prefixes.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Externally visible root URL, without a trailing slash.
    pub base_url: String,

    /// API version segment, e.g. `v1.1`.
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/sensorthings".to_string(),
            version: "v1.1".to_string(),
        }
    }
}

impl ServiceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::invalid("service.base_url", "must not be empty"));
        }
        if self.base_url.ends_with('/') {
            return Err(ConfigError::invalid(
                "service.base_url",
                "must not end with '/'",
            ));
        }
        if self.version.is_empty() || self.version.contains('/') {
            return Err(ConfigError::invalid(
                "service.version",
                "must be a single non-empty path segment",
            ));
        }

        Ok(())
    }

    /// Service root including the version segment.
    #[must_use]
    pub fn root_url(&self) -> String {
        format!("{}/{}", self.base_url, self.version)
    }
}

///
/// QueryConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Maximum nesting of `$expand` option trees; deeper requests are rejected.
    pub max_expand_depth: usize,

    /// Page size used when `$top` is absent.
    pub default_top: u64,

    /// Largest accepted page size; larger `$top` values are clamped.
    pub max_top: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_expand_depth: DEFAULT_MAX_EXPAND_DEPTH,
            default_top: DEFAULT_TOP,
            max_top: DEFAULT_MAX_TOP,
        }
    }
}

impl QueryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_top == 0 {
            return Err(ConfigError::invalid("query.default_top", "must be positive"));
        }
        if self.default_top > self.max_top {
            return Err(ConfigError::invalid(
                "query.default_top",
                format!("{} exceeds query.max_top {}", self.default_top, self.max_top),
            ));
        }

        Ok(())
    }
}

///
/// ExtensionConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionConfig {
    /// Register the STAplus entity kinds (Party, Project, License, Group, Relation).
    pub plus: bool,
}
