//! C-ECHO

use crate::acl::services;
use crate::archive::Archive;
use crate::error::{ArchiveError, Result};

/// Succeeds when `principal` may echo and the backend answers
///
/// A refused caller gets a processing failure, not a refusal status.
pub async fn echo(archive: &Archive, principal: &str) -> Result<()> {
    if let Err(e) = archive.document_store().ping().await {
        tracing::error!("Backend unreachable: {}", e);
        return Err(e.into());
    }
    if !archive.acl().is_allowed(principal, services::ECHO).await? {
        return Err(ArchiveError::processing_failure(format!(
            "User \"{}\" is not allowed to {}",
            principal,
            services::ECHO
        )));
    }
    Ok(())
}
