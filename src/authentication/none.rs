use dimse::AssociationParameters;

use super::Authenticator;

/// Accepts every association
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthenticatorNone;

impl Authenticator for AuthenticatorNone {
    fn authenticate(&self, _parameters: &AssociationParameters) -> bool {
        true
    }
}
