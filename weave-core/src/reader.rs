use crate::{
    CacheEntry, CacheError, CacheStore, CacheValue, FragmentMap, Result, Scope, Selection, Shape,
    TypeDescriptor, TypeSpec, is_directive_key,
};
use serde_json::{Map, Value};

/// Rebuilds the denormalized view of entity `id` restricted to `shape`.
///
/// Returns `Ok(None)` when the cache has no entry for `id`, callers fall back to the data they
/// originally received. The cache is never modified.
pub fn read_from_cache(
    id: &str,
    type_: &TypeDescriptor,
    spec: &TypeSpec,
    cache: &CacheStore,
    shape: &Shape,
    fragments: &FragmentMap,
) -> Result<Option<Value>> {
    Reader {
        spec,
        cache,
        fragments,
    }
    .read(id, type_, shape)
}

struct Reader<'a> {
    spec: &'a TypeSpec,
    cache: &'a CacheStore,
    fragments: &'a FragmentMap,
}

impl<'a> Reader<'a> {
    fn read(&self, id: &str, type_: &TypeDescriptor, shape: &Shape) -> Result<Option<Value>> {
        type_.require_object()?;
        let Some(entry) = self.cache.get(id) else {
            log::debug!("Cache miss for `{}` ({})", id, type_.name);
            return Ok(None);
        };
        let mut result = Map::new();
        result.insert("id".into(), Value::String(id.into()));
        for (key, selection) in shape {
            if is_directive_key(key) {
                continue;
            }
            let value = match selection {
                Selection::Scalar => entry.get(key).map(CacheValue::to_json),
                Selection::FragmentSpread(name) => {
                    let definition =
                        self.fragments
                            .get(name)
                            .ok_or_else(|| CacheError::UnknownFragment {
                                name: name.clone(),
                            })?;
                    let shape = definition.shape(&Scope::default());
                    Some(self.read(id, type_, &shape)?.unwrap_or(Value::Null))
                }
                Selection::Embedded { shape, .. } => {
                    Some(self.read(id, type_, shape)?.unwrap_or(Value::Null))
                }
                Selection::Link(shape) => self.read_link(type_, entry, key, shape)?,
                Selection::ParameterizedLink(shape) => {
                    self.read_link(type_, entry, key, &shape(&Scope::default()))?
                }
                Selection::Directive(..) => None,
            };
            if let Some(value) = value {
                result.insert(key.clone(), value);
            }
        }
        Ok(Some(Value::Object(result)))
    }

    fn read_link(
        &self,
        type_: &TypeDescriptor,
        entry: &CacheEntry,
        key: &str,
        shape: &Shape,
    ) -> Result<Option<Value>> {
        let pointer = type_.pointer_named(key)?;
        let target = self.spec.target_of(pointer)?;
        let Some(cached) = entry.get(key) else {
            return Ok(None);
        };
        let value = match (cached, pointer.card.is_many()) {
            (CacheValue::Refs(refs), true) => Value::Array(
                refs.iter()
                    // A reference to a missing entity keeps its slot as null
                    .map(|r| Ok(self.read(&r.id, target, shape)?.unwrap_or(Value::Null)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            (CacheValue::Ref(r), false) => self.read(&r.id, target, shape)?.unwrap_or(Value::Null),
            (CacheValue::Scalar(Value::Null), false) => Value::Null,
            (other, _) => {
                return Err(CacheError::CardinalityMismatch {
                    pointer: pointer.name.clone(),
                    expected: pointer.card,
                    found: other.to_json().to_string(),
                }
                .into());
            }
        };
        Ok(Some(value))
    }
}
