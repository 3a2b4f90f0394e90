use std::path::Path;

use dimse::DimseConfig;
use serde::Deserialize;
use thiserror::Error;

use super::{AuthenticationConfig, DatabaseConfig, LoggingConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid database configuration: {0}")]
    InvalidDatabase(String),

    #[error("Invalid DICOM configuration: {0}")]
    InvalidDicom(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Invalid authentication configuration: {0}")]
    InvalidAuthentication(String),
}

/// Archive configuration, one table per concern
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dicom: DimseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub authentication: AuthenticationConfig,
}

impl Config {
    /// Read, parse and validate a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse and validate TOML text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.dicom
            .validate()
            .map_err(|e| ConfigError::InvalidDicom(e.to_string()))?;
        self.logging.validate()?;
        self.authentication.validate()?;
        Ok(())
    }
}
