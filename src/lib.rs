//! PACS archive: a DICOM store, query and retrieve server over a document
//! database with a blob tier for large instances.

pub mod acl;
pub mod archive;
pub mod authentication;
pub mod backend;
pub mod config;
pub mod error;
pub mod peers;
pub mod query;
pub mod server;
pub mod storage;

use std::sync::Arc;

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::archive::Archive;
use crate::config::{Config, LoggingConfig};
use crate::error::{ArchiveError, Result};
use crate::server::Server;

/// Install the global subscriber: stdout, plus a file when configured
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| ArchiveError::Config(format!("Invalid log level: {}", e)))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true);

    let file_layer = if logging.log_to_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.log_file_path)
            .map_err(|e| {
                ArchiveError::Config(format!(
                    "Cannot open log file '{}': {}",
                    logging.log_file_path, e
                ))
            })?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Arc::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ArchiveError::Config(format!("Failed to initialize logging: {}", e)))
}

/// Build the backends and the archive described by `config`
pub fn build_archive(config: &Config) -> Result<Archive> {
    let store = backend::create_document_store(config.database.path.as_deref())?;
    let blobs = storage::create_blob_store(config.database.blob_dir.as_deref())?;
    Ok(Archive::new(
        store,
        blobs,
        &config.database,
        config.dicom.local_aet.clone(),
    ))
}

/// Bind the server described by `config`
pub async fn build_server(config: &Config) -> Result<Server> {
    let archive = build_archive(config)?;
    let authenticator = authentication::create_authenticator(&config.authentication)?;
    tracing::info!(
        "🔧 Database '{}', authentication '{}'",
        config.database.dbname,
        config.authentication.auth_type
    );
    Server::bind(config.dicom.clone(), archive, authenticator).await
}
