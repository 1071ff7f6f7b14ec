use crate::{
    CallSite, FragmentRecord, GeneratorConfig, GeneratorError, QueryRecord, SourceUnit, SpreadRef,
    extract,
    writer::{Context, GenericTsWriter, TsWriter},
};
use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

/// A generated TypeScript unit, `path` is relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub path: PathBuf,
    pub contents: String,
}

/// Every fragment and query declared by a set of sources, validated and linked.
#[derive(Debug, Clone)]
pub struct Manifest {
    config: GeneratorConfig,
    fragments: Vec<FragmentRecord>,
    queries: Vec<QueryRecord>,
}

impl Manifest {
    /// Extracts the declarations of `sources`, in the order given.
    pub fn scan<'s, I>(sources: I, config: GeneratorConfig) -> Result<Self>
    where
        I: IntoIterator<Item = &'s SourceUnit>,
    {
        let mut fragments = Vec::new();
        let mut queries = Vec::new();
        for source in sources {
            if config.is_output(&source.path) {
                log::debug!("Skipping generated unit {}", source.path.display());
                continue;
            }
            let extraction = extract(source, &config)?;
            fragments.extend(extraction.fragments);
            queries.extend(extraction.queries);
        }
        Self::from_records(fragments, queries, config)
    }

    /// Fails with `NameCollision` when two call sites produce the same name. Spreads of
    /// anything that is not a known fragment are dropped.
    pub fn from_records(
        mut fragments: Vec<FragmentRecord>,
        mut queries: Vec<QueryRecord>,
        config: GeneratorConfig,
    ) -> Result<Self> {
        check_collisions("Fragment", fragments.iter().map(|v| (v.name.as_str(), &v.site)))?;
        check_collisions("Query", queries.iter().map(|v| (v.name.as_str(), &v.site)))?;
        let known: HashSet<String> = fragments.iter().map(|v| v.name.clone()).collect();
        for FragmentRecord { name, spreads, .. } in &mut fragments {
            resolve_spreads(name, spreads, &known);
        }
        for QueryRecord { name, spreads, .. } in &mut queries {
            resolve_spreads(name, spreads, &known);
        }
        Ok(Self {
            config,
            fragments,
            queries,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn fragments(&self) -> &[FragmentRecord] {
        &self.fragments
    }

    pub fn queries(&self) -> &[QueryRecord] {
        &self.queries
    }

    pub fn fragment(&self, name: &str) -> Option<&FragmentRecord> {
        self.fragments.iter().find(|v| v.name == name)
    }

    /// Children before their parents, otherwise in scan order. Cycles are cut where they close.
    pub fn dependency_order(&self) -> Vec<&FragmentRecord> {
        let index: HashMap<&str, &FragmentRecord> = self
            .fragments
            .iter()
            .map(|v| (v.name.as_str(), v))
            .collect();
        let mut visited = HashSet::new();
        let mut result = Vec::with_capacity(self.fragments.len());
        for fragment in &self.fragments {
            visit(fragment, &index, &mut visited, &mut result);
        }
        result
    }

    pub fn emit(&self) -> Vec<GeneratedUnit> {
        self.emit_with(&GenericTsWriter::new(self.config.clone()))
    }

    /// One unit per fragment, one per query and the manifest last.
    pub fn emit_with(&self, writer: &dyn TsWriter) -> Vec<GeneratedUnit> {
        let context = Context::default();
        let mut result = Vec::with_capacity(self.fragments.len() + self.queries.len() + 1);
        let fragments_dir = Path::new(&self.config.fragments_dir);
        for fragment in &self.fragments {
            let mut out = String::with_capacity(2048);
            writer.write_fragment_unit(&context, &mut out, fragment);
            result.push(GeneratedUnit {
                path: fragments_dir.join(format!("{}.ts", fragment.name)),
                contents: out,
            });
        }
        let queries_dir = Path::new(&self.config.queries_dir);
        for query in &self.queries {
            let mut out = String::with_capacity(512);
            writer.write_query_unit(&context, &mut out, query);
            result.push(GeneratedUnit {
                path: queries_dir.join(format!("{}.ts", query.name)),
                contents: out,
            });
        }
        let mut out = String::with_capacity(128 * (self.fragments.len() + 1));
        writer.write_manifest(&context, &mut out, &self.dependency_order());
        result.push(GeneratedUnit {
            path: PathBuf::from(&self.config.manifest_file),
            contents: out,
        });
        result
    }

    /// Writes every unit under `out_dir`, replacing existing files. Returns the written paths.
    pub async fn write(&self, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let out_dir = out_dir.as_ref();
        let units = self.emit();
        let mut result = Vec::with_capacity(units.len());
        for unit in units {
            let path = out_dir.join(&unit.path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Could not create `{}`", parent.display()))?;
            }
            tokio::fs::write(&path, unit.contents)
                .await
                .with_context(|| format!("Could not write `{}`", path.display()))?;
            log::debug!("Wrote `{}`", path.display());
            result.push(path);
        }
        Ok(result)
    }
}

fn check_collisions<'a>(
    kind: &'static str,
    records: impl Iterator<Item = (&'a str, &'a CallSite)>,
) -> Result<()> {
    let mut sites: IndexMap<&str, Vec<CallSite>> = IndexMap::new();
    for (name, site) in records {
        sites.entry(name).or_default().push(site.clone());
    }
    match sites.into_iter().find(|(_, v)| v.len() > 1) {
        Some((name, sites)) => Err(GeneratorError::NameCollision {
            kind,
            name: name.into(),
            sites,
        }
        .into()),
        None => Ok(()),
    }
}

fn resolve_spreads(owner: &str, spreads: &mut Vec<SpreadRef>, known: &HashSet<String>) {
    spreads.retain(|spread| {
        let keep = spread.name != owner && known.contains(&spread.name);
        if !keep {
            log::warn!(
                "`{}` spreads `{}`, which is not a fragment, it will not be linked",
                owner,
                spread.name
            );
        }
        keep
    });
}

fn visit<'a>(
    fragment: &'a FragmentRecord,
    index: &HashMap<&str, &'a FragmentRecord>,
    visited: &mut HashSet<&'a str>,
    result: &mut Vec<&'a FragmentRecord>,
) {
    if !visited.insert(fragment.name.as_str()) {
        return;
    }
    for child in fragment.children() {
        if let Some(child) = index.get(child).copied() {
            visit(child, index, visited, result);
        }
    }
    result.push(fragment);
}
