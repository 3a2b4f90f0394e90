use serde::Deserialize;

use crate::config::ConfigError;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub log_to_file: bool,
    #[serde(default = "default_log_file_path")]
    pub log_file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_to_file: false,
            log_file_path: default_log_file_path(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "unknown level '{}'",
                self.level
            )));
        }
        if self.log_to_file && self.log_file_path.trim().is_empty() {
            return Err(ConfigError::InvalidLogging(
                "log_file_path is required when log_to_file is set".into(),
            ));
        }
        Ok(())
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_file_path() -> String {
    "./archive.log".to_string()
}
