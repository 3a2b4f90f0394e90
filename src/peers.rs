//! Known application entities, the destinations of C-MOVE

use std::sync::Arc;

use dimse::RemoteNode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::backend::{Document, DocumentStore, Filter};
use crate::error::{ArchiveError, Result};

/// A peer the archive may open associations to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationEntity {
    pub ae_title: String,
    pub host: String,
    pub port: u16,
}

impl ApplicationEntity {
    pub fn new(ae_title: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            ae_title: ae_title.into(),
            host: host.into(),
            port,
        }
    }

    pub fn to_remote_node(&self) -> RemoteNode {
        RemoteNode::new(&self.ae_title, &self.host, self.port)
    }
}

/// Peer table stored in `<db>.application_entities`
#[derive(Debug, Clone)]
pub struct PeerTable {
    store: Arc<dyn DocumentStore>,
    namespace: String,
}

impl PeerTable {
    pub fn new(store: Arc<dyn DocumentStore>, database: &str) -> Self {
        Self {
            store,
            namespace: format!("{}.application_entities", database),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn list(&self) -> Result<Vec<ApplicationEntity>> {
        self.store
            .find(&self.namespace, &Filter::All, None)
            .await?
            .into_iter()
            .map(parse_peer)
            .collect()
    }

    pub async fn find(&self, ae_title: &str) -> Result<Option<ApplicationEntity>> {
        self.store
            .find_one(&self.namespace, &Filter::eq("ae_title", ae_title))
            .await?
            .map(parse_peer)
            .transpose()
    }

    /// Add or replace the peer with this AE title
    pub async fn add(&self, peer: &ApplicationEntity) -> Result<()> {
        RemoteNode::new(&peer.ae_title, &peer.host, peer.port).validate()?;
        self.remove(&peer.ae_title).await?;

        let document = match serde_json::to_value(peer) {
            Ok(JsonValue::Object(document)) => document,
            Ok(_) => return Err(ArchiveError::processing_failure("peer is not an object")),
            Err(e) => return Err(ArchiveError::processing_failure(e.to_string())),
        };
        self.store.insert(&self.namespace, document).await?;
        tracing::debug!("Peer {} at {}:{}", peer.ae_title, peer.host, peer.port);
        Ok(())
    }

    pub async fn remove(&self, ae_title: &str) -> Result<u64> {
        Ok(self
            .store
            .remove(&self.namespace, &Filter::eq("ae_title", ae_title))
            .await?)
    }
}

fn parse_peer(mut document: Document) -> Result<ApplicationEntity> {
    document.remove("_id");
    serde_json::from_value(JsonValue::Object(document))
        .map_err(|e| ArchiveError::processing_failure(format!("Invalid peer entry: {}", e)))
}
