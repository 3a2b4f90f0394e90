//! Matching types of query keys (PS3.4 C.2.2.2)

use dicom_core::{Tag, VR};
use dimse::dataset::{is_binary, is_int, is_real, real_to_json, tag_key, Element, Value};
use serde_json::Value as JsonValue;

use crate::backend::Filter;
use crate::error::{ArchiveError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    SingleValue,
    ListOfUid,
    Universal,
    WildCard,
    Range,
    Sequence,
    MultipleValues,
    Unknown,
}

/// VRs for which `*` and `?` are plain characters
const NO_WILDCARD_VRS: [VR; 20] = [
    VR::DA,
    VR::DT,
    VR::TM,
    VR::SL,
    VR::SS,
    VR::UL,
    VR::US,
    VR::FD,
    VR::FL,
    VR::OB,
    VR::OD,
    VR::OF,
    VR::OL,
    VR::OW,
    VR::UN,
    VR::AT,
    VR::DS,
    VR::IS,
    VR::AS,
    VR::UI,
];

fn is_date_or_time(vr: VR) -> bool {
    matches!(vr, VR::DA | VR::DT | VR::TM)
}

/// Classify a query key
pub fn match_type(element: &Element) -> MatchType {
    let vr = element.vr;
    match &element.value {
        value if value.is_empty() => MatchType::Universal,
        Value::Strings(values) if values.iter().all(String::is_empty) => MatchType::Universal,
        Value::DataSets(_) => MatchType::Sequence,
        Value::Strings(_) if vr == VR::UI && element.value.len() > 1 => MatchType::ListOfUid,
        value if value.len() > 1 => MatchType::MultipleValues,
        Value::Strings(values) => {
            let text = match_text(vr, &values[0]);
            if !NO_WILDCARD_VRS.contains(&vr) && text.contains(['*', '?']) {
                MatchType::WildCard
            } else if is_date_or_time(vr) && text.contains('-') {
                MatchType::Range
            } else {
                MatchType::SingleValue
            }
        }
        Value::Integers(_) | Value::Reals(_) => MatchType::SingleValue,
        Value::Binary(_) => MatchType::Unknown,
    }
}

/// Text examined by the matching rules: the alphabetic group of a person name
fn match_text(vr: VR, value: &str) -> &str {
    if vr == VR::PN {
        value.split('=').next().unwrap_or("")
    } else {
        value
    }
}

/// Backend field holding the values of `tag`
pub fn value_field(tag: Tag, vr: VR) -> String {
    let suffix = if is_binary(vr) { "InlineBinary" } else { "Value" };
    format!("{}.{}", tag_key(tag), suffix)
}

/// Filter term for one query key; `None` for universal matching
pub fn term(tag: Tag, element: &Element) -> Result<Option<Filter>> {
    let field = value_field(tag, element.vr);
    let vr = element.vr;

    let filter = match match_type(element) {
        MatchType::Universal => return Ok(None),
        MatchType::Sequence => {
            return Err(ArchiveError::NotSupported(format!(
                "Sequence matching on {}",
                tag_key(tag)
            )))
        }
        MatchType::ListOfUid => {
            let uids = element
                .value
                .as_strings()
                .unwrap_or_default()
                .iter()
                .map(|uid| JsonValue::String(uid.clone()))
                .collect();
            Filter::In(field, uids)
        }
        MatchType::MultipleValues => {
            let mut alternatives = Vec::with_capacity(element.value.len());
            for item in items(element) {
                match term(tag, &item)? {
                    Some(filter) => alternatives.push(filter),
                    // A universal alternative matches everything
                    None => return Ok(None),
                }
            }
            Filter::Or(alternatives)
        }
        MatchType::WildCard => {
            let text = first_text(element);
            let pattern = wildcard_to_regex(match_text(vr, text));
            if vr == VR::PN {
                Filter::regex(format!("{}.Alphabetic", field), &pattern, true)?
            } else {
                Filter::regex(field, &pattern, false)?
            }
        }
        MatchType::Range => {
            let text = first_text(element);
            let (begin, end) = text.split_once('-').unwrap_or((text, ""));
            Filter::Range {
                field,
                gte: (!begin.is_empty()).then(|| JsonValue::String(begin.to_string())),
                lte: (!end.is_empty()).then(|| JsonValue::String(end.to_string())),
            }
        }
        MatchType::SingleValue => single_value(field, element),
        MatchType::Unknown => match &element.value {
            Value::Binary(blobs) => {
                use base64::{engine::general_purpose::STANDARD, Engine as _};
                let encoded = blobs.first().map(|b| STANDARD.encode(b)).unwrap_or_default();
                Filter::eq(field, encoded)
            }
            _ => Filter::eq(field, first_text(element).to_string()),
        },
    };
    Ok(Some(filter))
}

fn single_value(field: String, element: &Element) -> Filter {
    let vr = element.vr;
    match &element.value {
        Value::Strings(values) if vr == VR::PN => {
            let alphabetic = match_text(vr, &values[0]).to_string();
            Filter::eq(format!("{}.Alphabetic", field), alphabetic)
        }
        // Non-finite reals are stored as text, see `real_to_json`
        Value::Strings(values) if is_real(vr) => match values[0].trim().parse::<f64>() {
            Ok(real) => Filter::eq(field, real_to_json(real)),
            Err(_) => Filter::eq(field, values[0].clone()),
        },
        Value::Strings(values) if is_int(vr) => match values[0].trim().parse::<i64>() {
            Ok(int) => Filter::eq(field, int),
            Err(_) => Filter::eq(field, values[0].clone()),
        },
        Value::Strings(values) => Filter::eq(field, values[0].clone()),
        Value::Integers(values) => Filter::eq(field, values[0]),
        Value::Reals(values) => Filter::eq(field, real_to_json(values[0])),
        // Other shapes are routed elsewhere by `match_type`
        Value::Binary(_) | Value::DataSets(_) => Filter::Or(Vec::new()),
    }
}

fn first_text(element: &Element) -> &str {
    element
        .value
        .as_strings()
        .and_then(|values| values.first())
        .map(String::as_str)
        .unwrap_or("")
}

/// Single-valued elements, one per value
fn items(element: &Element) -> Vec<Element> {
    let vr = element.vr;
    match &element.value {
        Value::Strings(v) => v.iter().map(|x| Element::strings(vr, [x.clone()])).collect(),
        Value::Integers(v) => v.iter().map(|x| Element::integers(vr, [*x])).collect(),
        Value::Reals(v) => v.iter().map(|x| Element::reals(vr, [*x])).collect(),
        Value::Binary(v) => v.iter().map(|x| Element::binary(vr, [x.clone()])).collect(),
        Value::DataSets(v) => v.iter().map(|x| Element::data_sets([x.clone()])).collect(),
    }
}

/// Translate a DICOM wildcard pattern into an anchored regular expression
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '\\' | '.' | '^' | '$' | '[' | ']' | '(' | ')' | '+' | '{' | '}' | '|' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }
    regex.push('$');
    regex
}
