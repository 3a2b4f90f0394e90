//! Credentials file authentication
//!
//! One `user password` pair per line, separated by whitespace. Blank lines
//! and lines starting with `#` are ignored.

use std::collections::HashMap;
use std::path::Path;

use dimse::{AssociationParameters, UserIdentity};

use super::Authenticator;
use crate::error::{ArchiveError, Result};

#[derive(Debug, Clone, Default)]
pub struct AuthenticatorCsv {
    credentials: HashMap<String, String>,
}

impl AuthenticatorCsv {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ArchiveError::Config(format!(
                "Cannot read credentials file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let authenticator = Self::parse(&text);
        tracing::info!(
            "🔑 Loaded {} credentials from {}",
            authenticator.len(),
            path.display()
        );
        Ok(authenticator)
    }

    pub fn parse(text: &str) -> Self {
        let mut credentials = HashMap::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(user), Some(password), None) => {
                    credentials.insert(user.to_string(), password.to_string());
                }
                _ => tracing::warn!("Ignoring malformed credentials line {}", number + 1),
            }
        }
        Self { credentials }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl Authenticator for AuthenticatorCsv {
    fn authenticate(&self, parameters: &AssociationParameters) -> bool {
        match &parameters.user_identity {
            UserIdentity::UsernamePassword { username, password } => self
                .credentials
                .get(username)
                .map(|expected| expected == password)
                .unwrap_or(false),
            _ => false,
        }
    }
}
