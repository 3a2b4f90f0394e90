mod authentication_config;
mod database_config;
mod logging_config;
pub mod config;

pub use authentication_config::AuthenticationConfig;
pub use config::{Config, ConfigError};
pub use database_config::{DatabaseConfig, DEFAULT_GRIDFS_LIMIT};
pub use dimse::DimseConfig;
pub use logging_config::LoggingConfig;
