use crate::{
    CacheError, CacheStore, CacheValue, Context, OPTIMISTIC_KEY, Pointer, PointerKind, RefMarker,
    Result, TypeDescriptor, TypeSpec, identity_of, is_fragment_key, is_truthy, render_value,
};
use serde_json::Value;

/// Normalizes `data` (a record or an array of records of type `type_`) into `cache`.
///
/// Linked records become entries of their own and are replaced by reference markers, embedded
/// fragment payloads are flattened into the entry of their host. The store is mutated in place:
/// when an error is returned it may hold part of the data, use `CacheProvider::update` for an
/// all or nothing write.
pub fn update_cache(
    spec: &TypeSpec,
    cache: &mut CacheStore,
    data: &Value,
    type_: &TypeDescriptor,
) -> Result<()> {
    write_value(spec, cache, data, type_, true)
}

fn write_value(
    spec: &TypeSpec,
    cache: &mut CacheStore,
    data: &Value,
    type_: &TypeDescriptor,
    track_optimistic: bool,
) -> Result<()> {
    if let Value::Array(items) = data {
        for item in items {
            write_value(spec, cache, item, type_, track_optimistic)?;
        }
        return Ok(());
    }
    write_record(spec, cache, data, type_, track_optimistic).map(|_| ())
}

/// Writes one record and returns its identity.
fn write_record<'d>(
    spec: &TypeSpec,
    cache: &mut CacheStore,
    data: &'d Value,
    type_: &TypeDescriptor,
    track_optimistic: bool,
) -> Result<&'d str> {
    let (Some(id), Value::Object(fields)) = (identity_of(data), data) else {
        return Err(CacheError::MissingIdentity {
            record: render_value(data),
        }
        .into());
    };
    type_.require_object()?;
    log::trace!("Normalizing `{}` as `{}`", id, type_.name);
    cache.entry_mut(id);
    if track_optimistic {
        if fields.get(OPTIMISTIC_KEY).is_some_and(is_truthy) {
            cache.mark_optimistic(id);
        } else {
            cache.confirm(id);
        }
    }
    for (key, value) in fields {
        if key == OPTIMISTIC_KEY {
            continue;
        }
        if is_fragment_key(key) {
            // Same entity, different subset of its fields
            if identity_of(value).is_some_and(|v| v != id) {
                log::warn!(
                    "Fragment payload `{}` of `{}` carries a different id: {}",
                    key,
                    id,
                    render_value(value)
                );
            }
            write_value(spec, cache, value, type_, false)
                .with_context(|| format!("While writing fragment `{}` of `{}`", key, id))?;
            continue;
        }
        let stored = match type_.find_pointer(key) {
            Some(pointer) if pointer.kind == PointerKind::Link => {
                normalize_link(spec, cache, pointer, value)
                    .with_context(|| format!("While writing link `{}` of `{}`", key, id))?
            }
            // Properties, and computed selections that are not part of the schema
            _ => CacheValue::Scalar(value.clone()),
        };
        cache.insert_field(id, key.as_str(), stored);
    }
    Ok(id)
}

fn normalize_link(
    spec: &TypeSpec,
    cache: &mut CacheStore,
    pointer: &Pointer,
    value: &Value,
) -> Result<CacheValue> {
    let mismatch = || -> crate::Error {
        CacheError::CardinalityMismatch {
            pointer: pointer.name.clone(),
            expected: pointer.card,
            found: render_value(value),
        }
        .into()
    };
    let target = spec.target_of(pointer)?;
    if pointer.card.is_many() {
        let Value::Array(items) = value else {
            return Err(mismatch());
        };
        let mut refs = Vec::with_capacity(items.len());
        for item in items {
            let id = write_record(spec, cache, item, target, true)?;
            refs.push(RefMarker::new(id));
        }
        return Ok(CacheValue::Refs(refs));
    }
    if value.is_null() && pointer.card.accepts_empty() {
        return Ok(CacheValue::Scalar(Value::Null));
    }
    if identity_of(value).is_none() {
        return Err(mismatch());
    }
    let id = write_record(spec, cache, value, target, true)?;
    Ok(CacheValue::Ref(RefMarker::new(id)))
}
