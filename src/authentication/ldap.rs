//! Directory service authentication
//!
//! The association's username and password are checked by a simple bind
//! against the directory. The bind DN comes from a template in which
//! `%user` stands for the (escaped) username.

use std::time::Duration;

use dimse::{AssociationParameters, UserIdentity};
use ldap3::{dn_escape, LdapConn, LdapConnSettings};

use super::Authenticator;

/// Placeholder replaced by the username in the bind DN template
pub const USER_PLACEHOLDER: &str = "%user";

/// LDAP result code for a failed simple bind
const INVALID_CREDENTIALS: u32 = 49;

#[derive(Debug, Clone)]
pub struct AuthenticatorLdap {
    uri: String,
    bind_dn_template: String,
    timeout: Duration,
}

impl AuthenticatorLdap {
    pub fn new(uri: impl Into<String>, bind_dn_template: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            bind_dn_template: bind_dn_template.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Bind DN of `username`
    pub fn bind_dn(&self, username: &str) -> String {
        self.bind_dn_template
            .replace(USER_PLACEHOLDER, &dn_escape(username))
    }

    fn bind(&self, bind_dn: &str, password: &str) -> Result<bool, String> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);
        let mut connection =
            LdapConn::with_settings(settings, &self.uri).map_err(|e| e.to_string())?;
        let result = connection
            .simple_bind(bind_dn, password)
            .map_err(|e| e.to_string())?;
        let authenticated = match result.rc {
            0 => true,
            INVALID_CREDENTIALS => false,
            rc => return Err(format!("bind returned {}: {}", rc, result.text)),
        };
        if let Err(e) = connection.unbind() {
            tracing::debug!("LDAP unbind failed: {}", e);
        }
        Ok(authenticated)
    }
}

impl Authenticator for AuthenticatorLdap {
    fn authenticate(&self, parameters: &AssociationParameters) -> bool {
        let (username, password) = match &parameters.user_identity {
            UserIdentity::UsernamePassword { username, password } => (username, password),
            _ => return false,
        };
        // An empty password would be an unauthenticated bind
        if username.is_empty() || password.is_empty() {
            return false;
        }

        let bind_dn = self.bind_dn(username);
        // The blocking client starts its own runtime; keep it off the async worker
        let outcome = std::thread::scope(|scope| {
            scope
                .spawn(|| self.bind(&bind_dn, password))
                .join()
                .unwrap_or_else(|_| Err("LDAP bind thread panicked".to_string()))
        });

        match outcome {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!("LDAP bind refused for {}", bind_dn);
                false
            }
            Err(e) => {
                tracing::error!("LDAP bind against {} failed: {}", self.uri, e);
                false
            }
        }
    }
}
