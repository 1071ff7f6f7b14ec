use crate::{
    CacheError, CacheStore, Result, Scope, Selection, Shape, ShapeFn, TypeSpec, fragment_key,
    identity_of, read_from_cache, render_value,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

/// A `param` declared inside a fragment or query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FragmentKind {
    /// Bound to an entity type, it is co-located with the host entity.
    Entity { type_name: String },
    /// Groups top level query fields.
    Query,
}

/// Immutable definition of a named fragment.
#[derive(Clone)]
pub struct FragmentDefinition {
    pub name: String,
    pub kind: FragmentKind,
    pub text: String,
    pub params: Vec<ParamDefinition>,
    pub children: Vec<String>,
    shape: ShapeFn,
}

impl FragmentDefinition {
    pub fn entity<F>(name: impl Into<String>, type_name: impl Into<String>, shape: F) -> Self
    where
        F: Fn(&Scope) -> Shape + Send + Sync + 'static,
    {
        Self::new(
            name,
            FragmentKind::Entity {
                type_name: type_name.into(),
            },
            Arc::new(shape),
        )
    }

    pub fn query<F>(name: impl Into<String>, shape: F) -> Self
    where
        F: Fn(&Scope) -> Shape + Send + Sync + 'static,
    {
        Self::new(name, FragmentKind::Query, Arc::new(shape))
    }

    pub fn new(name: impl Into<String>, kind: FragmentKind, shape: ShapeFn) -> Self {
        Self {
            name: name.into(),
            kind,
            text: String::new(),
            params: Vec::new(),
            children: Vec::new(),
            shape,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = ParamDefinition>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    pub fn with_children<I: IntoIterator<Item = S>, S: Into<String>>(mut self, children: I) -> Self {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    /// Target type for entity fragments.
    pub fn type_name(&self) -> Option<&str> {
        match &self.kind {
            FragmentKind::Entity { type_name } => Some(type_name),
            FragmentKind::Query => None,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self.kind, FragmentKind::Query)
    }

    /// Key under which the fragment payload is embedded in its host.
    pub fn key(&self) -> String {
        fragment_key(&self.name)
    }

    pub fn shape(&self, scope: &Scope) -> Shape {
        (self.shape)(scope)
    }

    pub fn shape_fn(&self) -> ShapeFn {
        self.shape.clone()
    }

    /// Selection to attach to a query: the fragment alone, its children stay masked.
    pub fn masked(&self) -> Shape {
        Shape::new().spread(self.name.clone())
    }

    /// Selection with every nested spread expanded in place, so that each child receives its
    /// full declared shape.
    pub fn raw(&self, fragments: &FragmentMap, scope: &Scope) -> Result<Shape> {
        let mut path = vec![self.name.clone()];
        let shape = expand(self.shape(scope), fragments, scope, &mut path)?;
        Ok(Shape::new().embed(self.name.clone(), shape))
    }

    /// Reads the fragment view of `reference` from the cache.
    ///
    /// `reference` is either the host object carrying the `__Name` payload or the payload
    /// itself. Falls back to the payload when the cache has no entry for it.
    pub fn pull(
        &self,
        reference: &Value,
        spec: &TypeSpec,
        cache: &CacheStore,
        fragments: &FragmentMap,
    ) -> Result<Value> {
        let payload = self.payload(reference);
        let Some(type_name) = self.type_name() else {
            return Ok(payload.clone());
        };
        let Some(id) = identity_of(payload) else {
            return Err(CacheError::MissingIdentity {
                record: render_value(payload),
            }
            .into());
        };
        let type_ = spec.object_type(type_name)?;
        let shape = self.shape(&Scope::default());
        Ok(read_from_cache(id, type_, spec, cache, &shape, fragments)?
            .unwrap_or_else(|| payload.clone()))
    }

    /// The embedded `__Name` payload of `reference`, or `reference` itself.
    pub fn payload<'v>(&self, reference: &'v Value) -> &'v Value {
        reference
            .as_object()
            .and_then(|v| v.get(&self.key()))
            .unwrap_or(reference)
    }
}

impl Debug for FragmentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("text", &self.text)
            .field("params", &self.params)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

fn expand(
    shape: Shape,
    fragments: &FragmentMap,
    scope: &Scope,
    path: &mut Vec<String>,
) -> Result<Shape> {
    let mut result = Shape::new();
    for (key, selection) in shape.iter() {
        let selection = match selection {
            Selection::FragmentSpread(name) => {
                let definition =
                    fragments
                        .get(name)
                        .ok_or_else(|| CacheError::UnknownFragment {
                            name: name.clone(),
                        })?;
                expand_fragment(name, definition.shape(scope), fragments, scope, path)?
            }
            Selection::Embedded { name, shape } => {
                expand_fragment(name, shape.clone(), fragments, scope, path)?
            }
            Selection::Link(shape) => Selection::Link(expand(shape.clone(), fragments, scope, path)?),
            Selection::ParameterizedLink(f) => {
                let shape = expand(f(scope), fragments, scope, path)?;
                Selection::ParameterizedLink(Arc::new(move |_: &Scope| shape.clone()))
            }
            other => other.clone(),
        };
        result.insert(key, selection);
    }
    Ok(result)
}

fn expand_fragment(
    name: &str,
    shape: Shape,
    fragments: &FragmentMap,
    scope: &Scope,
    path: &mut Vec<String>,
) -> Result<Selection> {
    if path.iter().any(|v| v == name) {
        let mut cycle = path.clone();
        cycle.push(name.to_owned());
        return Err(CacheError::FragmentCycle {
            name: name.to_owned(),
            path: cycle,
        }
        .into());
    }
    path.push(name.to_owned());
    let shape = expand(shape, fragments, scope, path);
    path.pop();
    Ok(Selection::Embedded {
        name: name.to_owned(),
        shape: shape?,
    })
}

/// Registry of fragment definitions by name.
#[derive(Clone, Default, Debug)]
pub struct FragmentMap {
    fragments: IndexMap<String, Arc<FragmentDefinition>>,
}

impl FragmentMap {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers `definition`, returning the one it replaced.
    pub fn insert(&mut self, definition: FragmentDefinition) -> Option<Arc<FragmentDefinition>> {
        self.fragments
            .insert(definition.name.clone(), Arc::new(definition))
    }

    pub fn with(mut self, definition: FragmentDefinition) -> Self {
        self.insert(definition);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<FragmentDefinition>> {
        self.fragments.get(name)
    }

    /// Like `get` but fails with `UnknownFragment`.
    pub fn definition(&self, name: &str) -> Result<&Arc<FragmentDefinition>> {
        self.get(name).ok_or_else(|| {
            CacheError::UnknownFragment {
                name: name.into(),
            }
            .into()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FragmentDefinition>> {
        self.fragments.values()
    }
}

impl FromIterator<FragmentDefinition> for FragmentMap {
    fn from_iter<T: IntoIterator<Item = FragmentDefinition>>(iter: T) -> Self {
        let mut result = Self::new();
        for definition in iter {
            result.insert(definition);
        }
        result
    }
}
