use serde::Deserialize;
use std::path::PathBuf;

use crate::config::ConfigError;

/// Size above which content goes to the blob tier
pub const DEFAULT_GRIDFS_LIMIT: u64 = 16_000_000;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// redb file; the backend is in memory when omitted
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Main database name, prefix of every namespace
    #[serde(default = "default_dbname")]
    pub dbname: String,
    /// Optional separate database for bulk content
    #[serde(default)]
    pub bulk_data: Option<String>,
    /// Root of the blob tier; in memory when omitted
    #[serde(default)]
    pub blob_dir: Option<PathBuf>,
    #[serde(default = "default_gridfs_limit")]
    pub gridfs_limit: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            dbname: default_dbname(),
            bulk_data: None,
            blob_dir: None,
            gridfs_limit: default_gridfs_limit(),
        }
    }
}

impl DatabaseConfig {
    /// Bulk database name, treating an empty string as unset
    pub fn bulk_database(&self) -> Option<&str> {
        self.bulk_data.as_deref().filter(|name| !name.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_name("dbname", &self.dbname)?;
        if let Some(bulk) = self.bulk_database() {
            check_name("bulk_data", bulk)?;
        }
        if self.gridfs_limit == 0 {
            return Err(ConfigError::InvalidDatabase(
                "gridfs_limit must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn check_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidDatabase(format!("{} cannot be empty", field)));
    }
    if name.contains(['.', '/', '\\']) {
        return Err(ConfigError::InvalidDatabase(format!(
            "{} '{}' may not contain '.', '/' or '\\'",
            field, name
        )));
    }
    Ok(())
}

fn default_dbname() -> String {
    "pacs".to_string()
}

fn default_gridfs_limit() -> u64 {
    DEFAULT_GRIDFS_LIMIT
}
