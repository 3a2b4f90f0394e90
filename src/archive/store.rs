//! C-STORE

use dimse::{tags, DataSet};

use crate::acl::services;
use crate::archive::Archive;
use crate::error::{ArchiveError, Result};

/// Store one instance on behalf of `principal`
///
/// An instance already in the archive is accepted without being written
/// again.
pub async fn store(archive: &Archive, principal: &str, data_set: Option<&DataSet>) -> Result<()> {
    if !archive.acl().is_allowed(principal, services::STORE).await? {
        return Err(ArchiveError::not_authorized(format!(
            "User \"{}\" is not allowed to {}",
            principal,
            services::STORE
        )));
    }

    let data_set = data_set
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ArchiveError::InvalidObjectInstance("Empty data set".into()))?;
    let sop_instance_uid = data_set
        .as_string(tags::SOP_INSTANCE_UID, 0)
        .filter(|uid| !uid.trim().is_empty())
        .ok_or_else(|| ArchiveError::InvalidObjectInstance("Missing SOP Instance UID".into()))?;

    if archive.storage().exists(sop_instance_uid).await? {
        tracing::info!("{} already stored", sop_instance_uid);
        return Ok(());
    }

    archive.storage().store(data_set).await
}
