use std::sync::Arc;

use super::{Authenticator, AuthenticatorCsv, AuthenticatorJwt, AuthenticatorLdap, AuthenticatorNone};
use crate::config::AuthenticationConfig;
use crate::error::{ArchiveError, Result};

/// Build the authenticator selected by `[authentication] type`
pub fn create_authenticator(config: &AuthenticationConfig) -> Result<Arc<dyn Authenticator>> {
    match config.auth_type.as_str() {
        "none" => Ok(Arc::new(AuthenticatorNone)),
        "csv" => {
            let path = config
                .filepath
                .as_deref()
                .ok_or_else(|| ArchiveError::Config("csv authentication requires 'filepath'".into()))?;
            Ok(Arc::new(AuthenticatorCsv::from_file(path)?))
        }
        "jwt" => match (&config.secret, &config.public_key_path) {
            (Some(secret), None) => Ok(Arc::new(AuthenticatorJwt::with_secret(secret))),
            (None, Some(path)) => Ok(Arc::new(AuthenticatorJwt::with_public_key(path)?)),
            _ => Err(ArchiveError::Config(
                "jwt authentication requires exactly one of 'secret' or 'public_key_path'".into(),
            )),
        },
        "ldap" => match (&config.uri, &config.bind_dn_template) {
            (Some(uri), Some(template)) => Ok(Arc::new(AuthenticatorLdap::new(uri, template))),
            _ => Err(ArchiveError::Config(
                "ldap authentication requires 'uri' and 'bind_dn_template'".into(),
            )),
        },
        other => Err(ArchiveError::Config(format!(
            "Unknown authentication type '{}'",
            other
        ))),
    }
}
