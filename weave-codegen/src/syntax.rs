use crate::GeneratorError;
use anyhow::Result;
use std::{cell::RefCell, path::Path};
use tree_sitter::{Language, Node, Parser, Tree};

/// Grammar flavour used to parse a source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
}

impl Dialect {
    /// `.tsx` and `.jsx` files carry JSX, everything else is parsed as plain TypeScript.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|v| v.to_str()) {
            Some("tsx" | "jsx") => Dialect::Tsx,
            _ => Dialect::TypeScript,
        }
    }

    fn language(&self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::language_typescript(),
            Dialect::Tsx => tree_sitter_typescript::language_tsx(),
        }
    }
}

thread_local! {
    static TS_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
    static TSX_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

/// Parse `source` with the tree-sitter TypeScript grammar.
pub fn parse_source(source: &str, dialect: Dialect, path: &Path) -> Result<Tree> {
    let parser = match dialect {
        Dialect::TypeScript => &TS_PARSER,
        Dialect::Tsx => &TSX_PARSER,
    };
    parser.with(|cell| {
        let mut cell = cell.try_borrow_mut().map_err(|_| GeneratorError::Parse {
            path: path.to_path_buf(),
            message: "tree-sitter parser is already in use".into(),
        })?;
        if cell.is_none() {
            let mut parser = Parser::new();
            parser
                .set_language(dialect.language())
                .map_err(|e| GeneratorError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            *cell = Some(parser);
        }
        let parser = cell.as_mut().ok_or_else(|| GeneratorError::Parse {
            path: path.to_path_buf(),
            message: "tree-sitter parser is not initialized".into(),
        })?;
        parser.parse(source, None).ok_or_else(|| {
            GeneratorError::Parse {
                path: path.to_path_buf(),
                message: "tree-sitter failed to produce a syntax tree".into(),
            }
            .into()
        })
    })
}

/// Visit a node and all its descendants in pre-order.
pub fn visit_nodes<'a, F: FnMut(Node<'a>)>(node: Node<'a>, f: &mut F) {
    f(node);
    if node.child_count() == 0 {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit_nodes(child, f);
    }
}

/// Return the source text covered by `node`.
pub fn node_text<'a>(source: &'a str, node: Node<'_>) -> &'a str {
    &source[node.byte_range()]
}

/// Arguments of a call expression, comments excluded.
pub fn call_arguments(call: Node<'_>) -> Vec<Node<'_>> {
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = arguments.walk();
    let result = arguments
        .named_children(&mut cursor)
        .filter(|v| v.kind() != "comment")
        .collect();
    result
}

/// The callee of `call` when it is a plain identifier.
pub fn callee_identifier<'a>(source: &'a str, call: Node<'_>) -> Option<&'a str> {
    let callee = call.child_by_field_name("function")?;
    (callee.kind() == "identifier").then(|| node_text(source, callee))
}

/// The `(object, property)` pair of `node` when it is a member access on an identifier.
pub fn member_pair<'a>(source: &'a str, node: Node<'_>) -> Option<(&'a str, &'a str)> {
    if node.kind() != "member_expression" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    let property = node.child_by_field_name("property")?;
    if object.kind() != "identifier" {
        return None;
    }
    Some((node_text(source, object), node_text(source, property)))
}

/// The `(object, property)` pair of the callee of `call`, like `e.fragment`.
pub fn callee_member<'a>(source: &'a str, call: Node<'_>) -> Option<(&'a str, &'a str)> {
    member_pair(source, call.child_by_field_name("function")?)
}

/// Content of a string literal, quotes stripped and escapes preserved.
pub fn string_literal<'a>(source: &'a str, node: Node<'_>) -> Option<&'a str> {
    if node.kind() != "string" {
        return None;
    }
    let text = node_text(source, node);
    if text.len() < 2 {
        return None;
    }
    Some(&text[1..text.len() - 1])
}

/// Name of the closest named function containing `node`, anonymous functions are skipped.
pub fn enclosing_function_name<'a>(source: &'a str, node: Node<'_>) -> Option<&'a str> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if matches!(
            parent.kind(),
            "function_declaration"
                | "generator_function_declaration"
                | "function"
                | "function_expression"
        ) && let Some(name) = parent.child_by_field_name("name")
        {
            return Some(node_text(source, name));
        }
        current = parent.parent();
    }
    None
}

/// One-based line and column of `node`.
pub fn position(node: Node<'_>) -> (usize, usize) {
    let point = node.start_position();
    (point.row + 1, point.column + 1)
}
