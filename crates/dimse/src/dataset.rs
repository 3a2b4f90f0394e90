//! In-memory DICOM data sets and their DICOM JSON (PS3.18 F.2) form
//!
//! A [`DataSet`] is an ordered map from [`Tag`] to [`Element`]. Every element
//! carries its VR and a multi-valued [`Value`] whose shape follows the VR:
//! text, integers, reals, binary blobs or nested data sets.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use dicom_core::{Tag, VR};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};

use crate::{DimseError, Result};

/// Person name component groups, in PS3.5 order.
const PN_COMPONENTS: [&str; 3] = ["Alphabetic", "Ideographic", "Phonetic"];

/// Multi-valued element content
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Strings(Vec<String>),
    Integers(Vec<i64>),
    Reals(Vec<f64>),
    Binary(Vec<Vec<u8>>),
    DataSets(Vec<DataSet>),
}

impl Value {
    /// An empty value of the kind used by `vr`
    pub fn empty_for(vr: VR) -> Self {
        match ValueKind::of(vr) {
            ValueKind::Strings => Value::Strings(Vec::new()),
            ValueKind::Integers => Value::Integers(Vec::new()),
            ValueKind::Reals => Value::Reals(Vec::new()),
            ValueKind::Binary => Value::Binary(Vec::new()),
            ValueKind::DataSets => Value::DataSets(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Strings(v) => v.len(),
            Value::Integers(v) => v.len(),
            Value::Reals(v) => v.len(),
            Value::Binary(v) => v.len(),
            Value::DataSets(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Value::Strings(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integers(&self) -> Option<&[i64]> {
        match self {
            Value::Integers(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reals(&self) -> Option<&[f64]> {
        match self {
            Value::Reals(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[Vec<u8>]> {
        match self {
            Value::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_data_sets(&self) -> Option<&[DataSet]> {
        match self {
            Value::DataSets(v) => Some(v),
            _ => None,
        }
    }
}

/// Storage class of a VR's values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Strings,
    Integers,
    Reals,
    Binary,
    DataSets,
}

impl ValueKind {
    pub fn of(vr: VR) -> Self {
        match vr {
            VR::IS | VR::SL | VR::SS | VR::UL | VR::US | VR::SV | VR::UV => ValueKind::Integers,
            VR::DS | VR::FL | VR::FD => ValueKind::Reals,
            VR::OB | VR::OD | VR::OF | VR::OL | VR::OV | VR::OW | VR::UN => ValueKind::Binary,
            VR::SQ => ValueKind::DataSets,
            _ => ValueKind::Strings,
        }
    }
}

/// True when the VR stores raw bytes
pub fn is_binary(vr: VR) -> bool {
    ValueKind::of(vr) == ValueKind::Binary
}

/// True when the VR stores floating point numbers
pub fn is_real(vr: VR) -> bool {
    ValueKind::of(vr) == ValueKind::Reals
}

/// True when the VR stores integers
pub fn is_int(vr: VR) -> bool {
    ValueKind::of(vr) == ValueKind::Integers
}

/// Two-letter name of a VR
pub fn vr_name(vr: VR) -> String {
    vr.to_string().to_string()
}

/// Parse a two-letter VR name
pub fn parse_vr(name: &str) -> Option<VR> {
    match name.as_bytes() {
        [a, b] => VR::from_binary([*a, *b]),
        _ => None,
    }
}

/// `GGGGEEEE` key used by DICOM JSON and by stored metadata documents
pub fn tag_key(tag: Tag) -> String {
    format!("{:04X}{:04X}", tag.group(), tag.element())
}

/// Parse a `GGGGEEEE` key
pub fn parse_tag_key(key: &str) -> Option<Tag> {
    if key.len() != 8 || !key.is_ascii() {
        return None;
    }
    let group = u16::from_str_radix(&key[..4], 16).ok()?;
    let element = u16::from_str_radix(&key[4..], 16).ok()?;
    Some(Tag(group, element))
}

/// One data element: VR plus values
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub vr: VR,
    pub value: Value,
}

impl Element {
    pub fn new(vr: VR, value: Value) -> Self {
        Self { vr, value }
    }

    /// An element with no values (a universal matching key in queries)
    pub fn empty(vr: VR) -> Self {
        Self::new(vr, Value::empty_for(vr))
    }

    pub fn strings<S: Into<String>>(vr: VR, values: impl IntoIterator<Item = S>) -> Self {
        Self::new(vr, Value::Strings(values.into_iter().map(Into::into).collect()))
    }

    pub fn integers(vr: VR, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(vr, Value::Integers(values.into_iter().collect()))
    }

    pub fn reals(vr: VR, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(vr, Value::Reals(values.into_iter().collect()))
    }

    pub fn binary(vr: VR, values: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self::new(vr, Value::Binary(values.into_iter().collect()))
    }

    pub fn data_sets(values: impl IntoIterator<Item = DataSet>) -> Self {
        Self::new(VR::SQ, Value::DataSets(values.into_iter().collect()))
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// DICOM JSON object for this element
    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::new();
        object.insert("vr".to_string(), JsonValue::String(vr_name(self.vr)));
        if self.value.is_empty() {
            return JsonValue::Object(object);
        }

        match &self.value {
            Value::Strings(values) => {
                let items = values
                    .iter()
                    .map(|s| {
                        if s.is_empty() {
                            JsonValue::Null
                        } else if self.vr == VR::PN {
                            person_name_to_json(s)
                        } else {
                            JsonValue::String(s.clone())
                        }
                    })
                    .collect();
                object.insert("Value".to_string(), JsonValue::Array(items));
            }
            Value::Integers(values) => {
                object.insert("Value".to_string(), json!(values));
            }
            Value::Reals(values) => {
                let items = values.iter().copied().map(real_to_json).collect();
                object.insert("Value".to_string(), JsonValue::Array(items));
            }
            Value::Binary(values) => {
                let inline = if values.len() == 1 {
                    JsonValue::String(STANDARD.encode(&values[0]))
                } else {
                    JsonValue::Array(
                        values
                            .iter()
                            .map(|b| JsonValue::String(STANDARD.encode(b)))
                            .collect(),
                    )
                };
                object.insert("InlineBinary".to_string(), inline);
            }
            Value::DataSets(values) => {
                let items = values.iter().map(DataSet::to_json).collect();
                object.insert("Value".to_string(), JsonValue::Array(items));
            }
        }
        JsonValue::Object(object)
    }

    /// Parse a DICOM JSON element object
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| DimseError::data_set("element is not an object"))?;
        let vr_text = object
            .get("vr")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| DimseError::data_set("element has no vr"))?;
        let vr = parse_vr(vr_text)
            .ok_or_else(|| DimseError::data_set(format!("unknown VR '{}'", vr_text)))?;

        let value = match ValueKind::of(vr) {
            ValueKind::Binary => Value::Binary(match object.get("InlineBinary") {
                None | Some(JsonValue::Null) => Vec::new(),
                Some(JsonValue::String(s)) => vec![decode_base64(s)?],
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .ok_or_else(|| DimseError::data_set("InlineBinary item is not a string"))
                            .and_then(decode_base64)
                    })
                    .collect::<Result<Vec<_>>>()?,
                Some(_) => return Err(DimseError::data_set("InlineBinary has an invalid shape")),
            }),
            ValueKind::Strings => Value::Strings(
                value_items(object)?
                    .iter()
                    .map(|item| json_to_text(vr, item))
                    .collect::<Result<_>>()?,
            ),
            ValueKind::Integers => Value::Integers(
                value_items(object)?
                    .iter()
                    .map(json_to_integer)
                    .collect::<Result<_>>()?,
            ),
            ValueKind::Reals => Value::Reals(
                value_items(object)?
                    .iter()
                    .map(json_to_real)
                    .collect::<Result<_>>()?,
            ),
            ValueKind::DataSets => Value::DataSets(
                value_items(object)?
                    .iter()
                    .map(DataSet::from_json)
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(Self::new(vr, value))
    }
}

/// An ordered collection of elements keyed by tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    elements: BTreeMap<Tag, Element>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn has(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.elements.get(&tag)
    }

    /// Insert or replace an element
    pub fn add(&mut self, tag: Tag, element: Element) {
        self.elements.insert(tag, element);
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Element> {
        self.elements.remove(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &Element)> {
        self.elements.iter()
    }

    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.elements.keys().copied()
    }

    /// True when the element is absent or has no values
    pub fn is_empty_element(&self, tag: Tag) -> bool {
        self.get(tag).map(Element::is_empty).unwrap_or(true)
    }

    /// `index`-th text value of an element
    pub fn as_string(&self, tag: Tag, index: usize) -> Option<&str> {
        self.get(tag)
            .and_then(|e| e.value.as_strings())
            .and_then(|values| values.get(index))
            .map(String::as_str)
    }

    pub fn as_strings(&self, tag: Tag) -> Option<&[String]> {
        self.get(tag).and_then(|e| e.value.as_strings())
    }

    pub fn as_integer(&self, tag: Tag, index: usize) -> Option<i64> {
        self.get(tag)
            .and_then(|e| e.value.as_integers())
            .and_then(|values| values.get(index))
            .copied()
    }

    /// Builder-style insertion of a text element
    pub fn with_strings<S: Into<String>>(
        mut self,
        tag: Tag,
        vr: VR,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.add(tag, Element::strings(vr, values));
        self
    }

    /// Builder-style insertion of any element
    pub fn with(mut self, tag: Tag, element: Element) -> Self {
        self.add(tag, element);
        self
    }

    /// DICOM JSON object for the whole data set
    pub fn to_json(&self) -> JsonValue {
        let object = self
            .elements
            .iter()
            .map(|(tag, element)| (tag_key(*tag), element.to_json()))
            .collect::<Map<_, _>>();
        JsonValue::Object(object)
    }

    /// Parse a DICOM JSON object
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| DimseError::data_set("data set is not an object"))?;
        let mut data_set = DataSet::new();
        for (key, element) in object {
            let tag = parse_tag_key(key)
                .ok_or_else(|| DimseError::data_set(format!("invalid tag key '{}'", key)))?;
            data_set.add(tag, Element::from_json(element)?);
        }
        Ok(data_set)
    }

    /// Canonical byte form: the UTF-8 DICOM JSON document
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.to_json())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let json: JsonValue = serde_json::from_slice(bytes)?;
        Self::from_json(&json)
    }
}

impl FromIterator<(Tag, Element)> for DataSet {
    fn from_iter<I: IntoIterator<Item = (Tag, Element)>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl Serialize for DataSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = JsonValue::deserialize(deserializer)?;
        DataSet::from_json(&json).map_err(D::Error::custom)
    }
}

fn value_items(object: &Map<String, JsonValue>) -> Result<&[JsonValue]> {
    match object.get("Value") {
        None | Some(JsonValue::Null) => Ok(&[]),
        Some(JsonValue::Array(items)) => Ok(items),
        Some(_) => Err(DimseError::data_set("Value is not an array")),
    }
}

/// JSON form of a real; non-finite values become "NaN", "Infinity" or "-Infinity"
pub fn real_to_json(value: f64) -> JsonValue {
    if value.is_finite() {
        json!(value)
    } else if value.is_nan() {
        JsonValue::String("NaN".into())
    } else if value > 0.0 {
        JsonValue::String("Infinity".into())
    } else {
        JsonValue::String("-Infinity".into())
    }
}

/// Every group up to the last one present is written, empty or not, so
/// `Doe^John=` keeps its empty Ideographic group
fn person_name_to_json(value: &str) -> JsonValue {
    let object = PN_COMPONENTS
        .iter()
        .zip(value.split('='))
        .map(|(name, component)| (name.to_string(), JsonValue::String(component.to_string())))
        .collect();
    JsonValue::Object(object)
}

fn person_name_from_json(object: &Map<String, JsonValue>) -> String {
    let used = PN_COMPONENTS
        .iter()
        .rposition(|name| object.contains_key(*name))
        .map(|i| i + 1)
        .unwrap_or(1);
    PN_COMPONENTS[..used]
        .iter()
        .map(|name| object.get(*name).and_then(JsonValue::as_str).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("=")
}

fn json_to_text(vr: VR, item: &JsonValue) -> Result<String> {
    match item {
        JsonValue::Null => Ok(String::new()),
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Object(object) if vr == VR::PN => Ok(person_name_from_json(object)),
        other => Err(DimseError::data_set(format!(
            "unexpected {} value: {}",
            vr_name(vr),
            other
        ))),
    }
}

fn json_to_integer(item: &JsonValue) -> Result<i64> {
    match item {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| DimseError::data_set(format!("invalid integer {}", n))),
        JsonValue::String(s) => s
            .trim()
            .parse()
            .map_err(|_| DimseError::data_set(format!("invalid integer '{}'", s))),
        other => Err(DimseError::data_set(format!("invalid integer {}", other))),
    }
}

fn json_to_real(item: &JsonValue) -> Result<f64> {
    match item {
        JsonValue::Number(n) => n
            .as_f64()
            .ok_or_else(|| DimseError::data_set(format!("invalid real {}", n))),
        JsonValue::String(s) => s
            .trim()
            .parse()
            .map_err(|_| DimseError::data_set(format!("invalid real '{}'", s))),
        other => Err(DimseError::data_set(format!("invalid real {}", other))),
    }
}

fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| DimseError::data_set(format!("invalid InlineBinary: {}", e)))
}
