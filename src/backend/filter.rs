//! Filters over JSON documents
//!
//! Field paths are dot separated. Arrays met along a path are traversed, and
//! a predicate holds when any reached value satisfies it, so
//! `00100010.Value.Alphabetic` reaches the alphabetic group of every person
//! name in the element.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value as JsonValue};

use super::{BackendError, BackendResult, Document};

/// A compiled regular expression that remembers its source
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str, case_insensitive: bool) -> BackendResult<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| BackendError::InvalidFilter(format!("bad pattern '{}': {}", source, e)))?;
        Ok(Self {
            source: source.to_string(),
            case_insensitive,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

/// Document predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document
    All,
    /// Every sub-filter matches; an empty list matches everything
    And(Vec<Filter>),
    /// At least one sub-filter matches; an empty list matches nothing
    Or(Vec<Filter>),
    /// Field equals the value; `null` also matches an absent field
    Eq(String, JsonValue),
    /// Field equals one of the values
    In(String, Vec<JsonValue>),
    /// Text field matches the pattern
    Regex(String, Pattern),
    /// Field lies within the inclusive bounds
    Range {
        field: String,
        gte: Option<JsonValue>,
        lte: Option<JsonValue>,
    },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn regex(
        field: impl Into<String>,
        pattern: &str,
        case_insensitive: bool,
    ) -> BackendResult<Self> {
        Ok(Filter::Regex(
            field.into(),
            Pattern::new(pattern, case_insensitive)?,
        ))
    }

    /// AND of the filters, flattening the trivial cases
    pub fn and(mut filters: Vec<Filter>) -> Self {
        filters.retain(|f| *f != Filter::All);
        match filters.len() {
            0 => Filter::All,
            1 => filters.remove(0),
            _ => Filter::And(filters),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            Filter::Eq(field, expected) => {
                let candidates = values_at(document, field);
                if expected.is_null() && candidates.is_empty() {
                    return true;
                }
                candidates.iter().any(|c| json_eq(c, expected))
            }
            Filter::In(field, expected) => values_at(document, field)
                .iter()
                .any(|c| expected.iter().any(|e| json_eq(c, e))),
            Filter::Regex(field, pattern) => values_at(document, field)
                .iter()
                .any(|c| c.as_str().map(|s| pattern.is_match(s)).unwrap_or(false)),
            Filter::Range { field, gte, lte } => values_at(document, field).iter().any(|c| {
                let above = gte
                    .as_ref()
                    .map(|b| matches!(json_cmp(c, b), Some(Ordering::Greater | Ordering::Equal)))
                    .unwrap_or(true);
                let below = lte
                    .as_ref()
                    .map(|b| matches!(json_cmp(c, b), Some(Ordering::Less | Ordering::Equal)))
                    .unwrap_or(true);
                above && below
            }),
        }
    }
}

/// Every value reachable through `path`
///
/// An array at the end of the path contributes both itself and its items.
pub fn values_at<'a>(document: &'a Document, path: &str) -> Vec<&'a JsonValue> {
    let mut segments = path.split('.');
    let first = match segments.next().and_then(|s| document.get(s)) {
        Some(value) => value,
        None => return Vec::new(),
    };

    let mut current = vec![first];
    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match value {
                JsonValue::Object(object) => next.extend(object.get(segment)),
                JsonValue::Array(items) => next.extend(
                    items
                        .iter()
                        .filter_map(|item| item.as_object())
                        .filter_map(|object| object.get(segment)),
                ),
                _ => {}
            }
        }
        current = next;
    }

    let mut result = Vec::new();
    for value in current {
        if let JsonValue::Array(items) = value {
            result.extend(items.iter());
        }
        result.push(value);
    }
    result
}

/// Single value at `path`, without array traversal
pub fn value_at<'a>(document: &'a Document, path: &str) -> Option<&'a JsonValue> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Copy of `document` restricted to the given field paths (plus `_id`)
pub fn project(document: &Document, fields: &[String]) -> Document {
    let mut result = Map::new();
    if let Some(id) = document.get("_id") {
        result.insert("_id".to_string(), id.clone());
    }
    for field in fields {
        copy_path(document, &mut result, field);
    }
    result
}

fn copy_path(source: &Document, target: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = source.get(path) {
                target.insert(path.to_string(), value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(JsonValue::Object(inner)) = source.get(head) else {
                // Arrays and scalars are copied whole
                if let Some(value) = source.get(head) {
                    target.insert(head.to_string(), value.clone());
                }
                return;
            };
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if let JsonValue::Object(inner_target) = entry {
                copy_path(inner, inner_target, rest);
            }
        }
    }
}

fn json_eq(left: &JsonValue, right: &JsonValue) -> bool {
    match (left, right) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn json_cmp(left: &JsonValue, right: &JsonValue) -> Option<Ordering> {
    match (left, right) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
