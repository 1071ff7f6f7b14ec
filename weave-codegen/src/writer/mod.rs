mod context;
mod ts_writer;

pub use context::*;
pub use ts_writer::*;
