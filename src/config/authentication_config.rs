use serde::Deserialize;
use std::path::PathBuf;

use crate::config::ConfigError;

/// Selects and parameterises the association authenticator
#[derive(Debug, Deserialize, Clone)]
pub struct AuthenticationConfig {
    /// `none`, `csv`, `jwt` or `ldap`
    #[serde(rename = "type", default = "default_type")]
    pub auth_type: String,
    /// Credentials file for `csv`
    #[serde(default)]
    pub filepath: Option<PathBuf>,
    /// HS256 secret for `jwt`
    #[serde(default)]
    pub secret: Option<String>,
    /// RS256 public key (PEM) for `jwt`
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,
    /// Directory URI for `ldap`, e.g. `ldap://ldap.example.org`
    #[serde(default)]
    pub uri: Option<String>,
    /// Bind DN for `ldap`; `%user` is replaced by the username
    #[serde(default)]
    pub bind_dn_template: Option<String>,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            auth_type: default_type(),
            filepath: None,
            secret: None,
            public_key_path: None,
            uri: None,
            bind_dn_template: None,
        }
    }
}

impl AuthenticationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth_type.as_str() {
            "none" => Ok(()),
            "csv" => match &self.filepath {
                Some(_) => Ok(()),
                None => Err(ConfigError::InvalidAuthentication(
                    "csv authentication requires 'filepath'".into(),
                )),
            },
            "jwt" => match (&self.secret, &self.public_key_path) {
                (Some(_), None) | (None, Some(_)) => Ok(()),
                (Some(_), Some(_)) => Err(ConfigError::InvalidAuthentication(
                    "jwt authentication takes either 'secret' or 'public_key_path', not both"
                        .into(),
                )),
                (None, None) => Err(ConfigError::InvalidAuthentication(
                    "jwt authentication requires 'secret' or 'public_key_path'".into(),
                )),
            },
            "ldap" => match (&self.uri, &self.bind_dn_template) {
                (Some(uri), Some(template)) => {
                    if uri.trim().is_empty() {
                        return Err(ConfigError::InvalidAuthentication(
                            "ldap 'uri' cannot be empty".into(),
                        ));
                    }
                    if !template.contains("%user") {
                        return Err(ConfigError::InvalidAuthentication(
                            "ldap 'bind_dn_template' must contain '%user'".into(),
                        ));
                    }
                    Ok(())
                }
                _ => Err(ConfigError::InvalidAuthentication(
                    "ldap authentication requires 'uri' and 'bind_dn_template'".into(),
                )),
            },
            other => Err(ConfigError::InvalidAuthentication(format!(
                "unknown authentication type '{}'",
                other
            ))),
        }
    }
}

fn default_type() -> String {
    "none".to_string()
}
