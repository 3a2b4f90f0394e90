use once_cell::sync::OnceCell;
use redb::Database;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{BackendError, BackendResult};

/// Process-wide registry of open databases
///
/// redb holds an exclusive lock on its file, so every store opened on the
/// same path must share one `Database`.
static GLOBAL_DB_MANAGER: OnceCell<DatabaseManager> = OnceCell::new();

pub struct DatabaseManager {
    databases: Mutex<HashMap<PathBuf, Arc<Database>>>,
}

impl DatabaseManager {
    fn new() -> Self {
        Self {
            databases: Mutex::new(HashMap::new()),
        }
    }

    /// Get the global database manager instance
    pub fn global() -> &'static DatabaseManager {
        GLOBAL_DB_MANAGER.get_or_init(DatabaseManager::new)
    }

    /// Get or create a shared database instance for a specific path
    pub fn get_or_create_database(&self, db_path: &Path) -> BackendResult<Arc<Database>> {
        let db_path_buf = db_path.to_path_buf();

        let mut map = self
            .databases
            .lock()
            .map_err(|e| BackendError::Database(format!("Failed to lock database map: {}", e)))?;

        if let Some(existing_db) = map.get(&db_path_buf) {
            tracing::debug!(
                "🔄 Reusing existing database instance for: {}",
                db_path_buf.display()
            );
            return Ok(existing_db.clone());
        }

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!("🗄️  Opening archive database: {}", db_path.display());
        let db = Database::create(db_path)
            .map_err(|e| BackendError::Database(format!("Failed to create database: {}", e)))?;
        let db = Arc::new(db);
        map.insert(db_path_buf, db.clone());
        Ok(db)
    }

    /// Forget a database; it closes once the last store using it is dropped
    pub fn close_database(&self, db_path: &Path) -> BackendResult<bool> {
        let mut map = self
            .databases
            .lock()
            .map_err(|e| BackendError::Database(format!("Failed to lock database map: {}", e)))?;

        let removed = map.remove(db_path).is_some();
        if removed {
            tracing::info!("🗑️  Closed database: {}", db_path.display());
        }
        Ok(removed)
    }
}

/// Transaction helpers mapping redb errors into `BackendError`
pub struct DatabaseOperation;

impl DatabaseOperation {
    pub fn read<F, R>(db: &Database, operation: F) -> BackendResult<R>
    where
        F: FnOnce(&redb::ReadTransaction) -> BackendResult<R>,
    {
        let read_txn = db.begin_read().map_err(|e| {
            BackendError::Database(format!("Failed to begin read transaction: {}", e))
        })?;

        operation(&read_txn)
    }

    /// Run `operation` in a write transaction, committing only on success
    pub fn write<F, R>(db: &Database, operation: F) -> BackendResult<R>
    where
        F: FnOnce(&redb::WriteTransaction) -> BackendResult<R>,
    {
        let write_txn = db.begin_write().map_err(|e| {
            BackendError::Database(format!("Failed to begin write transaction: {}", e))
        })?;

        let result = operation(&write_txn)?;

        write_txn.commit().map_err(|e| {
            BackendError::Database(format!("Failed to commit write transaction: {}", e))
        })?;

        Ok(result)
    }
}
