use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings of the manifest generator and of the hook call-site transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Identifier the query builder is imported as.
    pub root_binding: String,
    /// Path of the query builder runtime, relative to the fragments and queries directories.
    pub runtime_module: String,
    pub fragments_dir: String,
    pub queries_dir: String,
    pub manifest_file: String,
    /// Files whose stem contains this are left untouched by the transform.
    pub transform_skip_pattern: String,
    /// Where the units are written. Sources below it are not scanned, they are previous output.
    pub output_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            root_binding: "e".into(),
            runtime_module: "..".into(),
            fragments_dir: "fragments".into(),
            queries_dir: "queries".into(),
            manifest_file: "manifest.ts".into(),
            transform_skip_pattern: "manifest".into(),
            output_dir: None,
        }
    }
}

impl GeneratorConfig {
    pub fn with_root_binding(mut self, root_binding: impl Into<String>) -> Self {
        self.root_binding = root_binding.into();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn is_output(&self, path: &Path) -> bool {
        self.output_dir.as_ref().is_some_and(|v| path.starts_with(v))
    }

    /// Module specifier of a runtime module, like `../select`.
    pub fn runtime_path(&self, module: &str) -> String {
        format!("{}/{}", self.runtime_module.trim_end_matches('/'), module)
    }
}
