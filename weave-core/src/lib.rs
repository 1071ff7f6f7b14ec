mod error;
mod fragment;
mod provider;
mod reader;
mod shape;
mod store;
mod type_spec;
mod util;
mod value;
mod writer;

pub use ::anyhow::Context;
pub use error::*;
pub use fragment::*;
pub use provider::*;
pub use reader::*;
pub use shape::*;
pub use store::*;
pub use type_spec::*;
pub use util::*;
pub use value::*;
pub use writer::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
