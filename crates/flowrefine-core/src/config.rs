//! Configuration schema (flowrefine.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::diagnostic::{DiagnosticCode, Severity};

/// How double-quoted text in a formula is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// `"text"` is a string literal and becomes `'text'`
    Literal,

    /// `"text"` is already a quoted identifier and is kept verbatim
    Identifier,
}

impl Default for QuoteStyle {
    fn default() -> Self {
        Self::Literal
    }
}

/// Expression transpiler settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranspilerConfig {
    /// Treatment of double-quoted text
    #[serde(default)]
    pub double_quoted: QuoteStyle,
}

/// Lineage enumeration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Maximum number of paths reported per source/target pair
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

fn default_max_paths() -> usize {
    10
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            max_paths: default_max_paths(),
        }
    }
}

/// Severity threshold overrides for specific diagnostic codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of diagnostic code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a diagnostic code, or default
    pub fn get_severity(&self, code: DiagnosticCode, default: Severity) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a code
    pub fn set_override(&mut self, code: DiagnosticCode, severity: Severity) {
        self.overrides.insert(code.as_str().to_string(), severity);
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transpiler: TranspilerConfig,

    #[serde(default)]
    pub lineage: LineageConfig,

    /// Severity thresholds
    #[serde(default)]
    pub severity: SeverityThreshold,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config.lineage.max_paths == 0 {
            return Err(ConfigError::Invalid("lineage.max_paths must be at least 1".to_string()));
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
