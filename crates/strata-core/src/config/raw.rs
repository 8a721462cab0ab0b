//! Untyped configuration mapping, as read from TOML.

use std::path::Path;

use toml::{Table, Value};

use super::ConfigError;

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Flat key → value mapping prior to validation.
///
/// Convert into a [`RunConfig`](super::RunConfig) with
/// [`RunConfig::from_raw`](super::RunConfig::from_raw) or `TryFrom`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConfig {
    table: Table,
}

impl RawConfig {
    /// The bundled default configuration.
    pub fn defaults() -> Self {
        // The bundled file is covered by `test_defaults_parse_and_validate`.
        let table = DEFAULT_CONFIG
            .parse::<Table>()
            .unwrap_or_else(|e| panic!("bundled default configuration is malformed: {e}"));
        Self { table }
    }

    /// Parse a TOML document on its own (no defaults applied).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table = content.parse::<Table>()?;
        Ok(Self { table })
    }

    /// Parse a TOML document and apply its keys on top of [`RawConfig::defaults`].
    pub fn layered_over_defaults(content: &str) -> Result<Self, ConfigError> {
        let overrides = Self::from_toml_str(content)?;
        let mut merged = Self::defaults();
        merged.table.extend(overrides.table);
        Ok(merged)
    }

    /// Read a TOML file layered over the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::layered_over_defaults(&content)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.table.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Insert or replace a key.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.table.insert(key.to_string(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.table.remove(key)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

impl Default for RawConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
