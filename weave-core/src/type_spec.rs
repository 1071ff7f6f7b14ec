use crate::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many target values a pointer resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    AtMostOne,
    One,
    Many,
    AtLeastOne,
}

impl Cardinality {
    pub fn is_many(&self) -> bool {
        matches!(self, Cardinality::Many | Cardinality::AtLeastOne)
    }
    pub fn accepts_empty(&self) -> bool {
        matches!(self, Cardinality::AtMostOne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Property,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Object,
    Scalar,
    #[serde(other)]
    Other,
}

/// A field declared on a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    pub name: String,
    pub kind: PointerKind,
    pub card: Cardinality,
    pub target_id: String,
}

impl Pointer {
    pub fn is_link(&self) -> bool {
        self.kind == PointerKind::Link
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub id: String,
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub pointers: Vec<Pointer>,
}

impl TypeDescriptor {
    /// Object type without pointers, extend it with the builder methods.
    pub fn object(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: TypeKind::Object,
            pointers: Vec::new(),
        }
    }
    pub fn scalar(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Scalar,
            ..Self::object(id, name)
        }
    }
    pub fn property(self, name: impl Into<String>, target_id: impl Into<String>) -> Self {
        self.pointer(name, PointerKind::Property, Cardinality::One, target_id)
    }
    pub fn link(
        self,
        name: impl Into<String>,
        card: Cardinality,
        target_id: impl Into<String>,
    ) -> Self {
        self.pointer(name, PointerKind::Link, card, target_id)
    }
    pub fn pointer(
        mut self,
        name: impl Into<String>,
        kind: PointerKind,
        card: Cardinality,
        target_id: impl Into<String>,
    ) -> Self {
        self.pointers.push(Pointer {
            name: name.into(),
            kind,
            card,
            target_id: target_id.into(),
        });
        self
    }

    pub fn is_object(&self) -> bool {
        self.kind == TypeKind::Object
    }

    /// Fails with `InvalidType` unless this is an object type.
    pub fn require_object(&self) -> Result<&Self> {
        if !self.is_object() {
            return Err(CacheError::InvalidType {
                type_name: self.name.clone(),
                kind: format!("{:?}", self.kind).to_lowercase(),
            }
            .into());
        }
        Ok(self)
    }

    pub fn find_pointer(&self, name: &str) -> Option<&Pointer> {
        self.pointers.iter().find(|p| p.name == name)
    }

    /// Like `find_pointer` but fails with `UnknownPointer`.
    pub fn pointer_named(&self, name: &str) -> Result<&Pointer> {
        self.find_pointer(name).ok_or_else(|| {
            CacheError::UnknownPointer {
                pointer: name.into(),
                type_name: self.name.clone(),
            }
            .into()
        })
    }
}

/// Read-only schema: type id to its descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeSpec {
    types: BTreeMap<String, TypeDescriptor>,
}

impl TypeSpec {
    pub fn new() -> Self {
        Default::default()
    }

    /// Parse either a list of descriptors or a map keyed by type id.
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Layout {
            List(Vec<TypeDescriptor>),
            Map(BTreeMap<String, TypeDescriptor>),
        }
        let layout: Layout = serde_json::from_str(json)?;
        Ok(match layout {
            Layout::List(list) => list.into_iter().collect(),
            Layout::Map(types) => Self { types },
        })
    }

    pub fn insert(&mut self, descriptor: TypeDescriptor) -> Option<TypeDescriptor> {
        self.types.insert(descriptor.id.clone(), descriptor)
    }

    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn get(&self, id: &str) -> Option<&TypeDescriptor> {
        self.types.get(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Lookup by type name (as opposed to id).
    pub fn find_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.values().find(|t| t.name == name)
    }

    /// Lookup an object type by name, fails with `InvalidType` when missing or not an object.
    pub fn object_type(&self, name: &str) -> Result<&TypeDescriptor> {
        match self.find_type(name) {
            Some(descriptor) => descriptor.require_object(),
            None => Err(CacheError::InvalidType {
                type_name: name.into(),
                kind: "missing".into(),
            }
            .into()),
        }
    }

    /// Target type of a link pointer, fails with `UnknownTargetType`.
    pub fn target_of(&self, pointer: &Pointer) -> Result<&TypeDescriptor> {
        self.get(&pointer.target_id).ok_or_else(|| {
            CacheError::UnknownTargetType {
                pointer: pointer.name.clone(),
                target_id: pointer.target_id.clone(),
            }
            .into()
        })
    }
}

impl FromIterator<TypeDescriptor> for TypeSpec {
    fn from_iter<T: IntoIterator<Item = TypeDescriptor>>(iter: T) -> Self {
        Self {
            types: iter.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }
}
