pub use weave_core::*;

/// Fragment manifest generator.
pub mod codegen {
    pub use ::weave_codegen::*;
}
