//! Document store persisted in a `redb` database file
//!
//! Each namespace is a table keyed by an insertion sequence number, holding
//! the JSON text of one document per row.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition, TableError};

use super::database_manager::{DatabaseManager, DatabaseOperation};
use super::filter::{project, Filter};
use super::{ensure_id, BackendError, BackendResult, Document, DocumentStore};

fn table(namespace: &str) -> TableDefinition<'_, u64, &'static str> {
    TableDefinition::new(namespace)
}

pub struct RedbStore {
    path: PathBuf,
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish()
    }
}

impl RedbStore {
    /// Open (or create) the database file, sharing the instance per path
    pub fn open(path: &Path) -> BackendResult<Self> {
        let db = DatabaseManager::global().get_or_create_database(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            db,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rows(&self, namespace: &str) -> BackendResult<Vec<(u64, Document)>> {
        DatabaseOperation::read(&self.db, |txn| {
            let table = match txn.open_table(table(namespace)) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => {
                    return Err(BackendError::Database(format!(
                        "Failed to open table {}: {}",
                        namespace, e
                    )))
                }
            };
            let iter = table.iter().map_err(|e| {
                BackendError::Database(format!("Failed to iterate {}: {}", namespace, e))
            })?;

            let mut rows = Vec::new();
            for entry in iter {
                let (key, value) = entry
                    .map_err(|e| BackendError::Database(format!("Failed to read entry: {}", e)))?;
                let document: Document = serde_json::from_str(value.value())?;
                rows.push((key.value(), document));
            }
            Ok(rows)
        })
    }

    /// Rewrite (or delete, on `None`) every row the callback selects
    fn rewrite<F>(&self, namespace: &str, filter: &Filter, mut change: F) -> BackendResult<u64>
    where
        F: FnMut(&mut Document) -> Option<()>,
    {
        DatabaseOperation::write(&self.db, |txn| {
            let mut table = txn.open_table(table(namespace)).map_err(|e| {
                BackendError::Database(format!("Failed to open table {}: {}", namespace, e))
            })?;

            let mut selected = Vec::new();
            {
                let iter = table.iter().map_err(|e| {
                    BackendError::Database(format!("Failed to iterate {}: {}", namespace, e))
                })?;
                for entry in iter {
                    let (key, value) = entry.map_err(|e| {
                        BackendError::Database(format!("Failed to read entry: {}", e))
                    })?;
                    let document: Document = serde_json::from_str(value.value())?;
                    if filter.matches(&document) {
                        selected.push((key.value(), document));
                    }
                }
            }

            for (key, mut document) in selected.iter().cloned() {
                match change(&mut document) {
                    Some(()) => {
                        let json = serde_json::to_string(&document)?;
                        table.insert(key, json.as_str()).map_err(|e| {
                            BackendError::Database(format!("Failed to update entry: {}", e))
                        })?;
                    }
                    None => {
                        table.remove(key).map_err(|e| {
                            BackendError::Database(format!("Failed to remove entry: {}", e))
                        })?;
                    }
                }
            }
            Ok(selected.len() as u64)
        })
    }
}

#[async_trait]
impl DocumentStore for RedbStore {
    async fn insert(&self, namespace: &str, mut document: Document) -> BackendResult<String> {
        let id = ensure_id(&mut document);
        let json = serde_json::to_string(&document)?;

        DatabaseOperation::write(&self.db, |txn| {
            let mut table = txn.open_table(table(namespace)).map_err(|e| {
                BackendError::Database(format!("Failed to open table {}: {}", namespace, e))
            })?;
            let next = match table
                .last()
                .map_err(|e| BackendError::Database(format!("Failed to read last entry: {}", e)))?
            {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };
            table
                .insert(next, json.as_str())
                .map_err(|e| BackendError::Database(format!("Failed to insert entry: {}", e)))?;
            Ok(())
        })?;

        tracing::debug!("🗄️  Inserted document {} into {}", id, namespace);
        Ok(id)
    }

    async fn find(
        &self,
        namespace: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> BackendResult<Vec<Document>> {
        Ok(self
            .rows(namespace)?
            .into_iter()
            .map(|(_, document)| document)
            .filter(|d| filter.matches(d))
            .map(|d| match projection {
                Some(fields) => project(&d, fields),
                None => d,
            })
            .collect())
    }

    async fn update_fields(
        &self,
        namespace: &str,
        filter: &Filter,
        fields: Document,
    ) -> BackendResult<u64> {
        self.rewrite(namespace, filter, |document| {
            for (key, value) in &fields {
                document.insert(key.clone(), value.clone());
            }
            Some(())
        })
    }

    async fn remove(&self, namespace: &str, filter: &Filter) -> BackendResult<u64> {
        self.rewrite(namespace, filter, |_| None)
    }

    async fn ping(&self) -> BackendResult<()> {
        self.db
            .begin_read()
            .map(|_| ())
            .map_err(|e| BackendError::Database(format!("Database unreachable: {}", e)))
    }
}
