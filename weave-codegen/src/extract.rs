use crate::{
    CallSite, GeneratorConfig, naming,
    syntax::{
        Dialect, call_arguments, callee_identifier, callee_member, enclosing_function_name,
        node_text, parse_source, position, string_literal, visit_nodes,
    },
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tree_sitter::Node;
use weave_core::{FragmentKind, ParamDefinition};

/// A TypeScript source file to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read `{}`", path.display()))?;
        Ok(Self::new(path, text))
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::from_path(&self.path)
    }
}

/// A spread of another fragment inside a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadRef {
    pub name: String,
    /// Byte offset, in the declaration text, right after the spread identifier.
    pub end: usize,
}

/// A fragment declared explicitly or implied by a hook call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRecord {
    pub name: String,
    pub kind: FragmentKind,
    /// Declaring call, like `e.fragment("Name", e.User, shape)`.
    pub text: String,
    pub spreads: Vec<SpreadRef>,
    pub params: Vec<ParamDefinition>,
    pub site: CallSite,
}

impl FragmentRecord {
    pub fn type_name(&self) -> Option<&str> {
        match &self.kind {
            FragmentKind::Entity { type_name } => Some(type_name),
            FragmentKind::Query => None,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self.kind, FragmentKind::Query)
    }

    /// Distinct spread fragments, in order of first appearance.
    pub fn children(&self) -> Vec<&str> {
        children_of(&self.spreads)
    }

    /// The declaration text with every spread `Child` rewritten to `Child.raw`.
    pub fn raw_text(&self) -> String {
        with_raw_spreads(&self.text, &self.spreads)
    }
}

/// A `query` call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub name: String,
    pub text: String,
    pub spreads: Vec<SpreadRef>,
    pub params: Vec<ParamDefinition>,
    pub site: CallSite,
}

impl QueryRecord {
    pub fn children(&self) -> Vec<&str> {
        children_of(&self.spreads)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub fragments: Vec<FragmentRecord>,
    pub queries: Vec<QueryRecord>,
}

fn children_of(spreads: &[SpreadRef]) -> Vec<&str> {
    let mut result: Vec<&str> = Vec::new();
    for spread in spreads {
        if !result.contains(&spread.name.as_str()) {
            result.push(&spread.name);
        }
    }
    result
}

fn with_raw_spreads(text: &str, spreads: &[SpreadRef]) -> String {
    let mut ends: Vec<_> = spreads
        .iter()
        .map(|v| v.end)
        .filter(|v| text.is_char_boundary(*v))
        .collect();
    ends.sort_unstable();
    ends.dedup();
    let mut result = String::with_capacity(text.len() + ends.len() * 4);
    let mut position = 0;
    for end in ends {
        result.push_str(&text[position..end]);
        result.push_str(".raw");
        position = end;
    }
    result.push_str(&text[position..]);
    result
}

/// Collects the fragment and query declarations of `source`, in source order.
///
/// Call sites that do not match structurally are skipped and logged, only a source the parser
/// cannot process at all is an error.
pub fn extract(source: &SourceUnit, config: &GeneratorConfig) -> Result<Extraction> {
    let tree = parse_source(&source.text, source.dialect(), &source.path)?;
    let root = tree.root_node();
    if root.has_error() {
        log::warn!(
            "`{}` has syntax errors, declarations around them might be missed",
            source.path.display()
        );
    }
    let scanner = Scanner { source, config };
    let mut result = Extraction::default();
    visit_nodes(root, &mut |node| {
        if node.kind() == "call_expression" {
            scanner.visit_call(node, &mut result);
        }
    });
    log::debug!(
        "Extracted {} fragments and {} queries from `{}`",
        result.fragments.len(),
        result.queries.len(),
        source.path.display()
    );
    Ok(result)
}

struct Scanner<'a> {
    source: &'a SourceUnit,
    config: &'a GeneratorConfig,
}

impl<'a> Scanner<'a> {
    fn text(&self) -> &'a str {
        &self.source.text
    }

    fn root(&self) -> &'a str {
        &self.config.root_binding
    }

    fn site(&self, node: Node<'_>) -> CallSite {
        let (line, column) = position(node);
        CallSite {
            path: self.source.path.clone(),
            line,
            column,
        }
    }

    fn visit_call(&self, call: Node<'_>, result: &mut Extraction) {
        if let Some((object, property)) = callee_member(self.text(), call) {
            if object != self.root() {
                return;
            }
            match property {
                "fragment" => result.fragments.extend(self.declared_fragment(call)),
                "queryFragment" => result.fragments.extend(self.declared_query_fragment(call)),
                "query" => result.queries.extend(self.declared_query(call)),
                _ => {}
            }
            return;
        }
        match callee_identifier(self.text(), call) {
            Some("useFragment") => result.fragments.extend(self.implicit_fragment(call)),
            Some("useQueryFragment") => {
                result.fragments.extend(self.implicit_query_fragment(call))
            }
            _ => {}
        }
    }

    fn declared_fragment(&self, call: Node<'_>) -> Option<FragmentRecord> {
        let args = call_arguments(call);
        let name = self.declared_name(call, &args)?;
        let Some(type_name) = args
            .get(1)
            .and_then(|v| schema_type_name(self.text(), *v, self.root()))
        else {
            log::debug!(
                "Skipping fragment `{}` at {}: the type is not a `{}.<Type>` expression",
                name,
                self.site(call),
                self.root()
            );
            return None;
        };
        Some(FragmentRecord {
            name,
            kind: FragmentKind::Entity { type_name },
            text: node_text(self.text(), call).to_owned(),
            spreads: self.spreads(call, call.start_byte(), 0),
            params: self.params(&[call]),
            site: self.site(call),
        })
    }

    fn declared_query_fragment(&self, call: Node<'_>) -> Option<FragmentRecord> {
        let args = call_arguments(call);
        let name = self.declared_name(call, &args)?;
        Some(FragmentRecord {
            name,
            kind: FragmentKind::Query,
            text: node_text(self.text(), call).to_owned(),
            spreads: self.spreads(call, call.start_byte(), 0),
            params: self.params(&[call]),
            site: self.site(call),
        })
    }

    fn declared_query(&self, call: Node<'_>) -> Option<QueryRecord> {
        let Some(function) = enclosing_function_name(self.text(), call) else {
            log::warn!(
                "Skipping the query at {}: it is not inside a named function",
                self.site(call)
            );
            return None;
        };
        Some(QueryRecord {
            name: naming::query_name(function),
            text: node_text(self.text(), call).to_owned(),
            spreads: self.spreads(call, call.start_byte(), 0),
            params: self.params(&[call]),
            site: self.site(call),
        })
    }

    fn implicit_fragment(&self, call: Node<'_>) -> Option<FragmentRecord> {
        let args = call_arguments(call);
        let [_, expr, shape] = args[..] else {
            log::debug!(
                "Skipping `useFragment` at {}: expected 3 arguments, found {}",
                self.site(call),
                args.len()
            );
            return None;
        };
        let Some(type_name) = schema_type_name(self.text(), expr, self.root()) else {
            log::debug!(
                "Skipping `useFragment` at {}: the type is not a `{}.<Type>` expression",
                self.site(call),
                self.root()
            );
            return None;
        };
        let Some(function) = enclosing_function_name(self.text(), call) else {
            log::warn!(
                "Skipping `useFragment` at {}: it is not inside a named function",
                self.site(call)
            );
            return None;
        };
        let name = naming::fragment_name(function, naming::short_type_name(&type_name));
        let prefix = naming::fragment_call_prefix(self.root(), &name);
        let expr_text = node_text(self.text(), expr);
        let shape_text = node_text(self.text(), shape);
        let mut spreads = self.spreads(expr, expr.start_byte(), prefix.len());
        spreads.extend(self.spreads(
            shape,
            shape.start_byte(),
            prefix.len() + expr_text.len() + ", ".len(),
        ));
        Some(FragmentRecord {
            text: naming::fragment_call(self.root(), &name, expr_text, shape_text),
            name,
            kind: FragmentKind::Entity { type_name },
            spreads,
            params: self.params(&[expr, shape]),
            site: self.site(call),
        })
    }

    fn implicit_query_fragment(&self, call: Node<'_>) -> Option<FragmentRecord> {
        let args = call_arguments(call);
        let [_, shape] = args[..] else {
            log::debug!(
                "Skipping `useQueryFragment` at {}: expected 2 arguments, found {}",
                self.site(call),
                args.len()
            );
            return None;
        };
        if callee_member(self.text(), shape) == Some((self.root(), "queryFragment")) {
            // Declared explicitly, recorded when visiting the inner call
            return None;
        }
        let Some(function) = enclosing_function_name(self.text(), call) else {
            log::warn!(
                "Skipping `useQueryFragment` at {}: it is not inside a named function",
                self.site(call)
            );
            return None;
        };
        let name = naming::query_fragment_name(function);
        let prefix = naming::query_fragment_call_prefix(self.root(), &name);
        Some(FragmentRecord {
            text: naming::query_fragment_call(self.root(), &name, node_text(self.text(), shape)),
            name,
            kind: FragmentKind::Query,
            spreads: self.spreads(shape, shape.start_byte(), prefix.len()),
            params: self.params(&[shape]),
            site: self.site(call),
        })
    }

    /// The string literal name of a declaration, if it can be used as a binding.
    fn declared_name(&self, call: Node<'_>, args: &[Node<'_>]) -> Option<String> {
        let Some(name) = args.first().and_then(|v| string_literal(self.text(), *v)) else {
            log::debug!(
                "Skipping the declaration at {}: the name is not a string literal",
                self.site(call)
            );
            return None;
        };
        if !naming::is_identifier(name) {
            log::warn!(
                "Skipping the declaration at {}: `{}` is not a valid identifier",
                self.site(call),
                name
            );
            return None;
        }
        Some(name.to_owned())
    }

    /// Spreads found under `node`, offsets moved from `base` in the source to `shift` in the
    /// declaration text.
    fn spreads(&self, node: Node<'_>, base: usize, shift: usize) -> Vec<SpreadRef> {
        let text = self.text();
        let mut result = Vec::new();
        visit_nodes(node, &mut |node| {
            if node.kind() != "spread_element" {
                return;
            }
            let Some(argument) = node.named_child(0) else {
                return;
            };
            let target = match argument.kind() {
                "identifier" => argument,
                "call_expression" => match argument.child_by_field_name("function") {
                    Some(function) if function.kind() == "identifier" => function,
                    _ => return,
                },
                _ => return,
            };
            result.push(SpreadRef {
                name: node_text(text, target).to_owned(),
                end: target.end_byte() - base + shift,
            });
        });
        result
    }

    fn params(&self, nodes: &[Node<'_>]) -> Vec<ParamDefinition> {
        let text = self.text();
        let mut result: Vec<ParamDefinition> = Vec::new();
        for node in nodes {
            visit_nodes(*node, &mut |node| {
                if node.kind() != "call_expression"
                    || callee_member(text, node) != Some((self.root(), "param"))
                {
                    return;
                }
                let args = call_arguments(node);
                let (Some(name), Some(type_)) = (
                    args.first().and_then(|v| string_literal(text, *v)),
                    args.get(1),
                ) else {
                    log::debug!("Skipping the param at {}", self.site(node));
                    return;
                };
                if result.iter().any(|v| v.name == name) {
                    return;
                }
                result.push(ParamDefinition {
                    name: name.to_owned(),
                    type_: node_text(text, *type_).to_owned(),
                    optional: args.iter().skip(2).any(|v| v.kind() == "true"),
                });
            });
        }
        result
    }
}

/// `User` out of `e.User`, `default.User` out of `e.default.User`.
pub(crate) fn schema_type_name(source: &str, node: Node<'_>, root: &str) -> Option<String> {
    if node.kind() != "member_expression" {
        return None;
    }
    node_text(source, node)
        .strip_prefix(root)
        .and_then(|v| v.strip_prefix('.'))
        .filter(|v| !v.is_empty() && v.split('.').all(naming::is_identifier))
        .map(ToOwned::to_owned)
}
