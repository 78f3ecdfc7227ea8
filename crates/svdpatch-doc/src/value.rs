use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

/// One node of a patch document: an ordered mapping, a sequence, or a
/// scalar. Mappings are built with [`IndexMap`] so that dispatch order
/// (§6.2: directives and peripheral/register bodies are applied in the
/// order they appear in the document) is preserved, and duplicate keys are
/// rejected at parse time rather than silently overwriting each other.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    Mapping(IndexMap<String, PatchValue>),
    Sequence(Vec<PatchValue>),
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl PatchValue {
    pub fn as_mapping(&self) -> Option<&IndexMap<String, PatchValue>> {
        match self {
            PatchValue::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[PatchValue]> {
        match self {
            PatchValue::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PatchValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PatchValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, PatchValue::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, PatchValue::Sequence(_))
    }

    pub fn get(&self, key: &str) -> Option<&PatchValue> {
        self.as_mapping().and_then(|m| m.get(key))
    }
}

/// Renders a value the way Python's `str()` would, since the original patch
/// engine always does `tag.text = str(value)` when writing a scalar into
/// the SVD tree.
impl fmt::Display for PatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchValue::String(s) => write!(f, "{s}"),
            PatchValue::Int(i) => write!(f, "{i}"),
            PatchValue::Float(x) => write!(f, "{x}"),
            PatchValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            PatchValue::Null => write!(f, "None"),
            PatchValue::Mapping(_) | PatchValue::Sequence(_) => write!(f, "{self:?}"),
        }
    }
}

impl<'de> Deserialize<'de> for PatchValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(PatchValueVisitor)
    }
}

struct PatchValueVisitor;

impl<'de> Visitor<'de> for PatchValueVisitor {
    type Value = PatchValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a YAML scalar, sequence, or mapping")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(PatchValue::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(PatchValue::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(PatchValue::Int(v as i64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(PatchValue::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(PatchValue::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
        Ok(PatchValue::String(v))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(PatchValue::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(PatchValue::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = Vec::new();
        while let Some(item) = seq.next_element::<PatchValue>()? {
            out.push(item);
        }
        Ok(PatchValue::Sequence(out))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut out = IndexMap::new();
        while let Some((key, value)) = map.next_entry::<String, PatchValue>()? {
            if out.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key '{key}' found")));
            }
            out.insert(key, value);
        }
        Ok(PatchValue::Mapping(out))
    }
}
