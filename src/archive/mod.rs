//! Archive services: ACL-checked access to the stored data sets
//!
//! C-FIND, C-GET and C-MOVE results come from [`DataSetGenerator`]s, which
//! materialize the matching records on `initialize` and rebuild one data set
//! at a time. C-ECHO and C-STORE are single calls.

use std::sync::Arc;

use async_trait::async_trait;
use dimse::{DataSet, Request};

use crate::acl::AccessControlList;
use crate::backend::DocumentStore;
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::peers::PeerTable;
use crate::storage::BlobStore;

pub mod echo;
pub mod find;
pub mod get;
mod helper;
pub mod move_;
pub mod storage;
pub mod store;

pub use echo::echo;
pub use find::FindGenerator;
pub use get::GetGenerator;
pub use move_::{MoveGenerator, SubAssociation};
pub use storage::Storage;
pub use store::store;

/// Iteration over the data sets answering one request
///
/// `initialize` must succeed before any other call. `get` rebuilds the
/// current data set once and returns the cached copy until `next` moves on.
#[async_trait]
pub trait DataSetGenerator: Send {
    async fn initialize(&mut self, request: &Request) -> Result<()>;

    /// True once every result has been visited
    fn done(&self) -> bool;

    fn next(&mut self);

    async fn get(&mut self) -> Result<DataSet>;

    /// Total number of results
    fn count(&self) -> usize;
}

/// Shared state of the archive services
#[derive(Debug, Clone)]
pub struct Archive {
    store: Arc<dyn DocumentStore>,
    acl: AccessControlList,
    storage: Storage,
    peers: PeerTable,
    ae_title: String,
}

impl Archive {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        database: &DatabaseConfig,
        ae_title: impl Into<String>,
    ) -> Self {
        let storage = Storage::new(
            store.clone(),
            blobs,
            &database.dbname,
            database.bulk_database(),
        )
        .with_gridfs_limit(database.gridfs_limit);
        Self {
            acl: AccessControlList::new(store.clone(), &database.dbname),
            peers: PeerTable::new(store.clone(), &database.dbname),
            store,
            storage,
            ae_title: ae_title.into(),
        }
    }

    pub fn document_store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn acl(&self) -> &AccessControlList {
        &self.acl
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Our AE title, calling AE of outgoing sub-associations
    pub fn ae_title(&self) -> &str {
        &self.ae_title
    }
}
