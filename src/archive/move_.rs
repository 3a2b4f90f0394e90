//! C-MOVE results and the sub-association they are sent on

use async_trait::async_trait;
use dimse::uids::DEFAULT_TRANSFER_SYNTAXES;
use dimse::{AssociationParameters, DataSet, Request};

use crate::archive::get::GetGenerator;
use crate::archive::{Archive, DataSetGenerator};
use crate::error::{ArchiveError, Result};

/// Where and how to open the C-MOVE sub-association
#[derive(Debug, Clone, PartialEq)]
pub struct SubAssociation {
    pub host: String,
    pub port: u16,
    pub parameters: AssociationParameters,
}

/// Same results as C-GET, delivered to a peer from the peer table
pub struct MoveGenerator {
    inner: GetGenerator,
}

impl MoveGenerator {
    pub fn new(archive: Archive, principal: impl Into<String>) -> Self {
        Self {
            inner: GetGenerator::new(archive, principal),
        }
    }

    /// Resolve the move destination; call after `initialize`
    pub async fn get_association(&self, request: &Request) -> Result<SubAssociation> {
        let destination = request
            .move_destination
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ArchiveError::MoveDestinationUnknown(String::new()))?;

        let archive = self.inner.archive();
        let peer = archive
            .peers()
            .find(destination)
            .await?
            .ok_or_else(|| ArchiveError::MoveDestinationUnknown(destination.to_string()))?;

        let parameters = self.inner.sop_classes().into_iter().fold(
            AssociationParameters::new(archive.ae_title(), &peer.ae_title),
            |parameters, sop_class| {
                parameters.with_presentation_context(sop_class, DEFAULT_TRANSFER_SYNTAXES)
            },
        );

        Ok(SubAssociation {
            host: peer.host,
            port: peer.port,
            parameters,
        })
    }
}

#[async_trait]
impl DataSetGenerator for MoveGenerator {
    async fn initialize(&mut self, request: &Request) -> Result<()> {
        self.inner.initialize(request).await
    }

    fn done(&self) -> bool {
        self.inner.done()
    }

    fn next(&mut self) {
        self.inner.next();
    }

    async fn get(&mut self) -> Result<DataSet> {
        self.inner.get().await
    }

    fn count(&self) -> usize {
        self.inner.count()
    }
}
