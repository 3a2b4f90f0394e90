//! Bearer token authentication
//!
//! The association must carry a JWT identity signed with the configured
//! HS256 secret or RS256 key. The token subject becomes the principal.

use std::path::Path;

use dimse::{AssociationParameters, UserIdentity};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::Authenticator;
use crate::error::{ArchiveError, Result};

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

pub struct AuthenticatorJwt {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl std::fmt::Debug for AuthenticatorJwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorJwt")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl AuthenticatorJwt {
    pub fn with_secret(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
        }
    }

    pub fn with_public_key(path: &Path) -> Result<Self> {
        let pem = std::fs::read(path).map_err(|e| {
            ArchiveError::Config(format!(
                "JWT: failed to read RSA public key at '{}': {}",
                path.display(),
                e
            ))
        })?;
        let decoding_key = DecodingKey::from_rsa_pem(&pem).map_err(|e| {
            ArchiveError::Config(format!(
                "JWT: failed to parse RSA public key at '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self {
            decoding_key,
            algorithm: Algorithm::RS256,
        })
    }

    fn token(parameters: &AssociationParameters) -> Option<&str> {
        match &parameters.user_identity {
            UserIdentity::Jwt { token } => Some(token),
            _ => None,
        }
    }

    /// Verified claims of a token
    fn claims(&self, token: &str) -> Option<Claims> {
        let header = decode_header(token).ok()?;
        if header.alg != self.algorithm {
            tracing::warn!("Unexpected JWT algorithm {:?}", header.alg);
            return None;
        }

        let validation = Validation::new(self.algorithm);
        match decode::<Claims>(token, &self.decoding_key, &validation) {
            // An empty subject would pass as the anonymous principal
            Ok(data) if data.claims.sub.trim().is_empty() => {
                tracing::warn!("JWT has an empty subject");
                None
            }
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::warn!("JWT verification failed: {}", e);
                None
            }
        }
    }
}

impl Authenticator for AuthenticatorJwt {
    fn authenticate(&self, parameters: &AssociationParameters) -> bool {
        Self::token(parameters)
            .and_then(|token| self.claims(token))
            .is_some()
    }

    fn principal(&self, parameters: &AssociationParameters) -> String {
        Self::token(parameters)
            .and_then(|token| self.claims(token))
            .map(|claims| claims.sub)
            .unwrap_or_default()
    }
}
