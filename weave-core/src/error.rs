use crate::Cardinality;
use thiserror::Error;

/// Schema and registry consistency failures raised by the cache reader and writer.
///
/// These are surfaced to the caller as `anyhow::Error`, use `downcast_ref::<CacheError>()` to
/// inspect the kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Tried to insert a record without a string id: {record}")]
    MissingIdentity { record: String },

    #[error("Expected type `{type_name}` with kind object, but got: {kind}")]
    InvalidType { type_name: String, kind: String },

    #[error("Pointer `{pointer}` has cardinality {expected:?}, but got: {found}")]
    CardinalityMismatch {
        pointer: String,
        expected: Cardinality,
        found: String,
    },

    #[error("Could not find pointer `{pointer}` on type `{type_name}`")]
    UnknownPointer { pointer: String, type_name: String },

    #[error("Could not find target type `{target_id}` for pointer `{pointer}`")]
    UnknownTargetType { pointer: String, target_id: String },

    #[error("Could not find fragment `{name}`")]
    UnknownFragment { name: String },

    #[error("Fragment `{name}` spreads itself through: {}", .path.join(" -> "))]
    FragmentCycle { name: String, path: Vec<String> },

    #[error("The cache is already being updated on this thread, update from outside the mutation")]
    NestedUpdate,
}
