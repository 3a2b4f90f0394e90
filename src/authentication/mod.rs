//! Association authentication
//!
//! The server asks the configured [`Authenticator`] about every associate
//! request and rejects the association when it answers `false`. The
//! principal it reports is the name the access control list knows the
//! caller by.

use dimse::{AssociationParameters, UserIdentity};

pub mod csv;
pub mod factory;
pub mod jwt;
pub mod ldap;
pub mod none;

pub use self::csv::AuthenticatorCsv;
pub use factory::create_authenticator;
pub use jwt::AuthenticatorJwt;
pub use ldap::AuthenticatorLdap;
pub use none::AuthenticatorNone;

pub trait Authenticator: Send + Sync + std::fmt::Debug {
    fn authenticate(&self, parameters: &AssociationParameters) -> bool;

    /// Principal of an authenticated association; empty when anonymous
    fn principal(&self, parameters: &AssociationParameters) -> String {
        username(&parameters.user_identity)
            .unwrap_or_default()
            .to_string()
    }
}

/// User name carried by an identity, if any
pub fn username(identity: &UserIdentity) -> Option<&str> {
    match identity {
        UserIdentity::Username { username } | UserIdentity::UsernamePassword { username, .. } => {
            Some(username)
        }
        UserIdentity::None | UserIdentity::Jwt { .. } => None,
    }
}
