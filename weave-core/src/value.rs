use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the reference marker object.
pub const REF_KEY: &str = "__ref__";
/// Key flagging a client synthesized record.
pub const OPTIMISTIC_KEY: &str = "__optimistic__";
/// Prefix of the keys holding an embedded fragment payload.
pub const FRAGMENT_KEY_PREFIX: &str = "__";

/// Whether `key` holds an embedded fragment (`__Name`) rather than a field.
pub fn is_fragment_key(key: &str) -> bool {
    key.len() > FRAGMENT_KEY_PREFIX.len()
        && key.starts_with(FRAGMENT_KEY_PREFIX)
        && key != REF_KEY
        && key != OPTIMISTIC_KEY
}

pub fn fragment_key(name: &str) -> String {
    format!("{FRAGMENT_KEY_PREFIX}{name}")
}

/// Fragment name carried by a `__Name` key.
pub fn fragment_name(key: &str) -> Option<&str> {
    if is_fragment_key(key) {
        key.strip_prefix(FRAGMENT_KEY_PREFIX)
    } else {
        None
    }
}

/// Normalized placeholder of a link: `{"__ref__": id}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefMarker {
    #[serde(rename = "__ref__")]
    pub id: String,
}

impl RefMarker {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A field as stored in a cache entry. Links never hold embedded objects.
///
/// The serialized form is untagged: a scalar `[]` or `{"__ref__": id}` reads back as a
/// reference unless the schema says otherwise, see `CacheStore::from_json_with_spec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    Ref(RefMarker),
    Refs(Vec<RefMarker>),
    Scalar(Value),
}

impl CacheValue {
    pub fn to_json(&self) -> Value {
        match self {
            CacheValue::Scalar(v) => v.clone(),
            CacheValue::Ref(r) => reference_json(r),
            CacheValue::Refs(refs) => Value::Array(refs.iter().map(reference_json).collect()),
        }
    }

    pub fn as_ref_marker(&self) -> Option<&RefMarker> {
        match self {
            CacheValue::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_refs(&self) -> Option<&[RefMarker]> {
        match self {
            CacheValue::Refs(refs) => Some(refs),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            CacheValue::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for CacheValue {
    fn from(value: Value) -> Self {
        CacheValue::Scalar(value)
    }
}

impl From<RefMarker> for CacheValue {
    fn from(value: RefMarker) -> Self {
        CacheValue::Ref(value)
    }
}

fn reference_json(marker: &RefMarker) -> Value {
    let mut map = serde_json::Map::with_capacity(1);
    map.insert(REF_KEY.into(), Value::String(marker.id.clone()));
    Value::Object(map)
}
