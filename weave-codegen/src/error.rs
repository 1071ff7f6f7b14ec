use std::{
    fmt::{self, Display},
    path::PathBuf,
};
use thiserror::Error;

/// Location of a declaration in the scanned sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSite {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Could not parse `{}`: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error(
        "{kind} `{name}` is generated by more than one call site: {}",
        .sites.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    NameCollision {
        kind: &'static str,
        name: String,
        sites: Vec<CallSite>,
    },
}
