//! Access control: who may use which service, and on which records
//!
//! Entries are `(principal, service, constraint)` documents in the
//! `<database>.authorization` namespace. A principal of `"*"` stands for any
//! authenticated caller and `""` for anonymous callers only; a service of
//! `"*"` stands for every service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::backend::{Document, DocumentStore, Filter};
use crate::error::{ArchiveError, Result};

/// Service names used in entries
pub mod services {
    pub const ECHO: &str = "Echo";
    pub const QUERY: &str = "Query";
    pub const RETRIEVE: &str = "Retrieve";
    pub const STORE: &str = "Store";
    pub const ANY: &str = "*";
}

/// One row of the access control table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    #[serde(rename = "principal_name")]
    pub principal: String,
    pub service: String,
    /// Record pattern: `{}` or `""` for no restriction, else a map from field
    /// path to a literal or a `{"$regex", "$options"}` object
    #[serde(rename = "dataset", default = "unrestricted")]
    pub constraint: JsonValue,
}

impl AccessControlEntry {
    pub fn new(principal: impl Into<String>, service: impl Into<String>, constraint: JsonValue) -> Self {
        Self {
            principal: principal.into(),
            service: service.into(),
            constraint,
        }
    }

    /// An entry granting `service` on every record
    pub fn unrestricted(principal: impl Into<String>, service: impl Into<String>) -> Self {
        Self::new(principal, service, unrestricted())
    }

    pub fn is_unrestricted(&self) -> bool {
        match &self.constraint {
            JsonValue::Null => true,
            JsonValue::String(s) => s.is_empty(),
            JsonValue::Object(o) => o.is_empty(),
            _ => false,
        }
    }

    /// The constraint as a filter over stored records
    fn to_filter(&self) -> Result<Filter> {
        let fields = self.constraint.as_object().ok_or_else(|| {
            ArchiveError::processing_failure(format!(
                "Invalid constraint for {}/{}: {}",
                self.principal, self.service, self.constraint
            ))
        })?;

        let mut terms = Vec::with_capacity(fields.len());
        for (path, value) in fields {
            let field = value_path(path);
            let term = match regex_of(value) {
                Some((pattern, case_insensitive)) => {
                    Filter::regex(field, pattern, case_insensitive)?
                }
                None => Filter::Eq(field, value.clone()),
            };
            terms.push(term);
        }
        Ok(Filter::And(terms))
    }
}

fn unrestricted() -> JsonValue {
    JsonValue::Object(Map::new())
}

fn regex_of(value: &JsonValue) -> Option<(&str, bool)> {
    let object = value.as_object()?;
    let pattern = object.get("$regex")?.as_str()?;
    let options = object.get("$options").and_then(JsonValue::as_str).unwrap_or("");
    Some((pattern, options.contains('i')))
}

/// Point a constraint path at the stored element's `Value` array
///
/// `00100020` becomes `00100020.Value` and `00100010.Alphabetic` becomes
/// `00100010.Value.Alphabetic`; paths already naming `Value` are kept.
pub fn value_path(path: &str) -> String {
    match path.split_once('.') {
        None => format!("{}.Value", path),
        Some((_, rest)) if rest == "Value" || rest.starts_with("Value.") => path.to_string(),
        Some((tag, rest)) => format!("{}.Value.{}", tag, rest),
    }
}

#[derive(Debug, Clone)]
pub struct AccessControlList {
    store: Arc<dyn DocumentStore>,
    namespace: String,
}

impl AccessControlList {
    pub fn new(store: Arc<dyn DocumentStore>, database: &str) -> Self {
        Self {
            store,
            namespace: format!("{}.authorization", database),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn entry_filter(principal: &str, service: &str) -> Filter {
        let principal = if principal.is_empty() {
            Filter::eq("principal_name", "")
        } else {
            Filter::In(
                "principal_name".into(),
                vec![principal.into(), services::ANY.into()],
            )
        };
        let service = Filter::In(
            "service".into(),
            vec![service.into(), services::ANY.into()],
        );
        Filter::And(vec![principal, service])
    }

    async fn matching(&self, principal: &str, service: &str) -> Result<Vec<AccessControlEntry>> {
        let filter = Self::entry_filter(principal, service);
        self.store
            .find(&self.namespace, &filter, None)
            .await?
            .into_iter()
            .map(parse_entry)
            .collect()
    }

    /// Whether any entry lets `principal` use `service`
    pub async fn is_allowed(&self, principal: &str, service: &str) -> Result<bool> {
        let filter = Self::entry_filter(principal, service);
        Ok(self.store.find_one(&self.namespace, &filter).await?.is_some())
    }

    /// Record filter for `principal` on `service`
    ///
    /// `None` means unrestricted. With no matching entry the filter matches
    /// nothing; callers check [`is_allowed`](Self::is_allowed) first.
    pub async fn get_constraints(&self, principal: &str, service: &str) -> Result<Option<Filter>> {
        let entries = self.matching(principal, service).await?;

        let mut alternatives = Vec::with_capacity(entries.len());
        for entry in &entries {
            if entry.is_unrestricted() {
                return Ok(None);
            }
            alternatives.push(entry.to_filter()?);
        }
        Ok(Some(Filter::Or(alternatives)))
    }

    pub async fn get_entries(&self) -> Result<Vec<AccessControlEntry>> {
        self.store
            .find(&self.namespace, &Filter::All, None)
            .await?
            .into_iter()
            .map(parse_entry)
            .collect()
    }

    /// Replace the whole table
    pub async fn set_entries(&self, entries: &[AccessControlEntry]) -> Result<()> {
        self.store.remove(&self.namespace, &Filter::All).await?;
        for entry in entries {
            self.add_entry(entry).await?;
        }
        tracing::debug!("🔐 Access control list now has {} entries", entries.len());
        Ok(())
    }

    pub async fn add_entry(&self, entry: &AccessControlEntry) -> Result<()> {
        let document = match serde_json::to_value(entry) {
            Ok(JsonValue::Object(document)) => document,
            Ok(_) => return Err(ArchiveError::processing_failure("entry is not an object")),
            Err(e) => return Err(ArchiveError::processing_failure(e.to_string())),
        };
        self.store.insert(&self.namespace, document).await?;
        Ok(())
    }

    /// Remove the entries of exactly this principal and service
    pub async fn remove_entries(&self, principal: &str, service: &str) -> Result<u64> {
        let filter = Filter::And(vec![
            Filter::eq("principal_name", principal),
            Filter::eq("service", service),
        ]);
        Ok(self.store.remove(&self.namespace, &filter).await?)
    }
}

fn parse_entry(mut document: Document) -> Result<AccessControlEntry> {
    document.remove("_id");
    serde_json::from_value(JsonValue::Object(document))
        .map_err(|e| ArchiveError::processing_failure(format!("Invalid authorization entry: {}", e)))
}
