//! # Ledger Configuration
//!
//! Bounds applied when markets are created. Loaded from JSON by hosts, or
//! taken from [`LedgerConfig::default`].

use crate::{error::Result, LedgerError, MAX_OPTIONS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Validation bounds for market creation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum description length, in characters
    pub max_description_len: usize,

    /// Maximum length of each option label, in characters
    pub max_option_len: usize,

    /// Maximum number of options per market (at most [`MAX_OPTIONS`])
    pub max_options: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_description_len: 256,
            max_option_len: 64,
            max_options: MAX_OPTIONS,
        }
    }
}

impl LedgerConfig {
    /// Check that every bound is usable
    pub fn validate(&self) -> Result<()> {
        if self.max_description_len == 0 {
            return Err(LedgerError::Config(
                "max_description_len must be positive".to_string(),
            ));
        }
        if self.max_option_len == 0 {
            return Err(LedgerError::Config(
                "max_option_len must be positive".to_string(),
            ));
        }
        if self.max_options == 0 || self.max_options > MAX_OPTIONS {
            return Err(LedgerError::Config(format!(
                "max_options must be between 1 and {MAX_OPTIONS}, got {}",
                self.max_options
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub(crate) fn check_description(&self, description: &str) -> Result<()> {
        if description.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "Description cannot be empty".to_string(),
            ));
        }
        let len = description.chars().count();
        if len > self.max_description_len {
            return Err(LedgerError::InvalidInput(format!(
                "Description is {len} characters, limit is {}",
                self.max_description_len
            )));
        }
        Ok(())
    }

    pub(crate) fn check_options(&self, options: &[String]) -> Result<()> {
        if options.is_empty() || options.len() > self.max_options {
            return Err(LedgerError::InvalidInput(format!(
                "Markets need between 1 and {} options, got {}",
                self.max_options,
                options.len()
            )));
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in options {
            if option.trim().is_empty() {
                return Err(LedgerError::InvalidInput(
                    "Option labels cannot be empty".to_string(),
                ));
            }
            if option.chars().count() > self.max_option_len {
                return Err(LedgerError::InvalidInput(format!(
                    "Option '{option}' exceeds {} characters",
                    self.max_option_len
                )));
            }
            if !seen.insert(option.as_str()) {
                return Err(LedgerError::InvalidInput(format!(
                    "Duplicate option '{option}'"
                )));
            }
        }
        Ok(())
    }
}
