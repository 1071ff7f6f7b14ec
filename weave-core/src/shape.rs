use crate::fragment_key;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

/// Keys carrying query construction instructions instead of fields.
pub const DIRECTIVE_KEYS: [&str; 3] = ["filter_single", "filter", "order_by"];

pub fn is_directive_key(key: &str) -> bool {
    DIRECTIVE_KEYS.contains(&key)
}

/// Produces a shape for a scope, used by parameterized links and fragment definitions.
pub type ShapeFn = Arc<dyn Fn(&Scope) -> Shape + Send + Sync>;

/// Variables visible while evaluating a shape function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub params: Map<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// What to materialize for one key of a shape.
#[derive(Clone)]
pub enum Selection {
    /// Copy the value as is.
    Scalar,
    /// Follow a link with a nested shape.
    Link(Shape),
    /// Follow a link whose shape depends on the scope (filtered or ordered sub-selections).
    ParameterizedLink(ShapeFn),
    /// Masked fragment, resolved by name through the registry.
    FragmentSpread(String),
    /// Raw fragment, its shape travels inline.
    Embedded { name: String, shape: Shape },
    /// Filtering and ordering payload, never materialized.
    Directive(Value),
}

impl Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Scalar => f.write_str("Scalar"),
            Selection::Link(shape) => f.debug_tuple("Link").field(shape).finish(),
            Selection::ParameterizedLink(..) => f.write_str("ParameterizedLink(..)"),
            Selection::FragmentSpread(name) => f.debug_tuple("FragmentSpread").field(name).finish(),
            Selection::Embedded { name, shape } => f
                .debug_struct("Embedded")
                .field("name", name)
                .field("shape", shape)
                .finish(),
            Selection::Directive(v) => f.debug_tuple("Directive").field(v).finish(),
        }
    }
}

/// Declarative, ordered description of the fields to read for a type.
#[derive(Clone, Default, Debug)]
pub struct Shape {
    fields: IndexMap<String, Selection>,
}

impl Shape {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        self.with(name, Selection::Scalar)
    }

    pub fn fields<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        for name in names {
            self.insert(name, Selection::Scalar);
        }
        self
    }

    pub fn link(self, name: impl Into<String>, shape: Shape) -> Self {
        self.with(name, Selection::Link(shape))
    }

    pub fn link_with<F>(self, name: impl Into<String>, shape: F) -> Self
    where
        F: Fn(&Scope) -> Shape + Send + Sync + 'static,
    {
        self.with(name, Selection::ParameterizedLink(Arc::new(shape)))
    }

    /// Spreads the fragment `name` under its `__name` key.
    pub fn spread(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with(fragment_key(&name), Selection::FragmentSpread(name))
    }

    pub fn embed(self, name: impl Into<String>, shape: Shape) -> Self {
        let name = name.into();
        self.with(fragment_key(&name), Selection::Embedded { name, shape })
    }

    pub fn directive(self, key: impl Into<String>, value: Value) -> Self {
        self.with(key, Selection::Directive(value))
    }

    pub fn with(mut self, key: impl Into<String>, selection: Selection) -> Self {
        self.insert(key, selection);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, selection: Selection) -> Option<Selection> {
        self.fields.insert(key.into(), selection)
    }

    /// Adds every key of `other`, later keys replace earlier ones.
    pub fn merge(mut self, other: Shape) -> Self {
        self.fields.extend(other.fields);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Selection> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a Shape {
    type Item = (&'a String, &'a Selection);
    type IntoIter = indexmap::map::Iter<'a, String, Selection>;
    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
