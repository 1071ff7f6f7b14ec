use crate::{CacheValue, Result, TypeSpec};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Known fields of one entity.
pub type CacheEntry = BTreeMap<String, CacheValue>;

/// Normalized store: one entry per identity, links kept as references.
///
/// The set of optimistic identities travels with the store, so independent caches never
/// observe each other's client synthesized records. It is not part of the serialized snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStore {
    entries: BTreeMap<String, CacheEntry>,
    optimistic: BTreeSet<String>,
}

impl CacheStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_entries(entries: BTreeMap<String, CacheEntry>) -> Self {
        Self {
            entries,
            optimistic: Default::default(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    pub fn field(&self, id: &str, field: &str) -> Option<&CacheValue> {
        self.entries.get(id)?.get(field)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entry of `id`, created empty when missing.
    pub fn entry_mut(&mut self, id: &str) -> &mut CacheEntry {
        self.entries.entry(id.to_owned()).or_default()
    }

    pub fn insert_field(&mut self, id: &str, field: impl Into<String>, value: CacheValue) {
        self.entry_mut(id).insert(field.into(), value);
    }

    /// Drops the entry and its optimistic mark. References to it become dangling.
    pub fn evict(&mut self, id: &str) -> Option<CacheEntry> {
        self.optimistic.remove(id);
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, CacheEntry> {
        &self.entries
    }

    pub fn is_optimistic(&self, id: &str) -> bool {
        self.optimistic.contains(id)
    }

    pub fn optimistic_ids(&self) -> impl Iterator<Item = &str> {
        self.optimistic.iter().map(String::as_str)
    }

    /// Returns true if the identity was not already marked.
    pub fn mark_optimistic(&mut self, id: &str) -> bool {
        self.optimistic.insert(id.to_owned())
    }

    /// Server confirmed data arrived for `id`. Returns true if it was marked optimistic.
    pub fn confirm(&mut self, id: &str) -> bool {
        self.optimistic.remove(id)
    }

    /// The snapshot as a json value, `{ id: { field: value } }`.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.entries)?)
    }

    /// Loads a snapshot produced by `to_json`.
    ///
    /// The snapshot does not say which fields are links: an empty array or a `{"__ref__": id}`
    /// object stored as a plain value loads back as a reference. Reads are unaffected, use
    /// `from_json_with_spec` to get the stored form back.
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(Self::from_entries(serde_json::from_value(value)?))
    }

    /// Like `from_json`, fields that are not a link of any object type of `spec` load as scalars.
    pub fn from_json_with_spec(value: Value, spec: &TypeSpec) -> Result<Self> {
        let mut result = Self::from_json(value)?;
        let links: BTreeSet<&str> = spec
            .iter()
            .flat_map(|v| v.pointers.iter())
            .filter(|v| v.is_link())
            .map(|v| v.name.as_str())
            .collect();
        for entry in result.entries.values_mut() {
            for (field, value) in entry.iter_mut() {
                if value.as_scalar().is_none() && !links.contains(field.as_str()) {
                    *value = CacheValue::Scalar(value.to_json());
                }
            }
        }
        Ok(result)
    }
}

impl Serialize for CacheStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CacheStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        BTreeMap::deserialize(deserializer).map(Self::from_entries)
    }
}
