mod config;
mod error;
mod extract;
mod manifest;
pub mod naming;
pub mod syntax;
mod transform;
mod util;
mod writer;

pub use config::*;
pub use error::*;
pub use extract::*;
pub use manifest::*;
pub use transform::*;
pub use util::*;
pub use writer::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
