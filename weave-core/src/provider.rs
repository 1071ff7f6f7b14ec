use crate::{
    CacheError, CacheStore, FragmentDefinition, FragmentMap, Result, Scope, Shape, TypeSpec,
    read_from_cache, render_value, update_cache,
};
use serde_json::Value;
use std::{
    cell::RefCell,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::watch;

thread_local! {
    /// Providers with an update running on this thread.
    static UPDATING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a provider as updating on the current thread until dropped.
struct UpdateScope(usize);

impl UpdateScope {
    fn enter(provider: &CacheProvider) -> Result<Self> {
        let key = provider as *const CacheProvider as usize;
        UPDATING.with_borrow_mut(|v| {
            if v.contains(&key) {
                return Err(CacheError::NestedUpdate.into());
            }
            v.push(key);
            Ok(Self(key))
        })
    }
}

impl Drop for UpdateScope {
    fn drop(&mut self) {
        UPDATING.with_borrow_mut(|v| v.retain(|k| *k != self.0));
    }
}

/// Shared cache context: the schema, the fragment registry and the current store snapshot.
///
/// Updates are applied to a private copy of the latest snapshot and published only when they
/// succeed, overlapping updates are serialized. Subscribers are notified after each publish and
/// read again to stay consistent. Reads never wait for a running update, they see the last
/// published snapshot.
pub struct CacheProvider {
    spec: Arc<TypeSpec>,
    fragments: FragmentMap,
    sender: watch::Sender<Arc<CacheStore>>,
    updates: Mutex<()>,
}

impl CacheProvider {
    pub fn new(spec: impl Into<Arc<TypeSpec>>, fragments: FragmentMap) -> Self {
        Self::with_store(spec, fragments, CacheStore::new())
    }

    pub fn with_store(
        spec: impl Into<Arc<TypeSpec>>,
        fragments: FragmentMap,
        store: CacheStore,
    ) -> Self {
        let (sender, _) = watch::channel(Arc::new(store));
        Self {
            spec: spec.into(),
            fragments,
            sender,
            updates: Mutex::new(()),
        }
    }

    pub fn spec(&self) -> &TypeSpec {
        &self.spec
    }

    pub fn fragments(&self) -> &FragmentMap {
        &self.fragments
    }

    /// The current store, unaffected by later updates.
    pub fn snapshot(&self) -> Arc<CacheStore> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheStore>> {
        self.sender.subscribe()
    }

    pub fn is_optimistic(&self, id: &str) -> bool {
        self.sender.borrow().is_optimistic(id)
    }

    /// Applies `mutation` to a copy of the latest snapshot and publishes it on success.
    ///
    /// The mutation may read the provider. Starting another update from inside it fails with
    /// `NestedUpdate`.
    pub fn update<F>(&self, mutation: F) -> Result<()>
    where
        F: FnOnce(&mut CacheStore) -> Result<()>,
    {
        let _scope = UpdateScope::enter(self)?;
        let _guard = self.updates.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = CacheStore::clone(&self.sender.borrow());
        mutation(&mut next)?;
        self.sender.send_replace(Arc::new(next));
        Ok(())
    }

    /// Normalizes `data` of type `type_name` into the cache.
    pub fn write(&self, type_name: &str, data: &Value) -> Result<()> {
        let type_ = self.spec.object_type(type_name)?;
        self.update(|store| update_cache(&self.spec, store, data, type_))
    }

    pub fn read(&self, type_name: &str, id: &str, shape: &Shape) -> Result<Option<Value>> {
        let type_ = self.spec.object_type(type_name)?;
        read_from_cache(
            id,
            type_,
            &self.spec,
            &self.snapshot(),
            shape,
            &self.fragments,
        )
    }

    /// Pulls the fragment payload of `reference`, stores it and returns the cached view.
    ///
    /// The cached view reflects every other write touching the same identity, the pulled data is
    /// returned when the cache cannot answer.
    pub fn use_fragment(&self, reference: &Value, fragment: &FragmentDefinition) -> Result<Value> {
        let data = fragment.pull(reference, &self.spec, &self.snapshot(), &self.fragments)?;
        let Some(type_name) = fragment.type_name() else {
            return Ok(data);
        };
        self.write(type_name, &data)?;
        fragment.pull(&data, &self.spec, &self.snapshot(), &self.fragments)
    }

    /// Replaces the fragment view of `id` with `updater(previous)` merged over it.
    ///
    /// Read, merge and write happen within a single update. Records created by the updater can
    /// carry `__optimistic__` to be tracked until the server confirms them.
    pub fn update_fragment<F>(&self, name: &str, id: &str, updater: F) -> Result<()>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let definition = self.fragments.definition(name)?;
        let Some(type_name) = definition.type_name() else {
            return Err(CacheError::InvalidType {
                type_name: name.into(),
                kind: "query fragment".into(),
            }
            .into());
        };
        let type_ = self.spec.object_type(type_name)?;
        self.update(|store| {
            let shape = definition.shape(&Scope::default());
            let previous = read_from_cache(id, type_, &self.spec, store, &shape, &self.fragments)?;
            let mut data = match updater(previous.as_ref()) {
                Value::Object(update) => {
                    let mut merged = match previous {
                        Some(Value::Object(previous)) => previous,
                        _ => Default::default(),
                    };
                    merged.extend(update);
                    merged
                }
                other => {
                    return Err(CacheError::MissingIdentity {
                        record: render_value(&other),
                    }
                    .into());
                }
            };
            data.entry("id").or_insert_with(|| Value::String(id.into()));
            update_cache(&self.spec, store, &Value::Object(data), type_)
        })
    }
}
