use crate::{
    GeneratorConfig, SourceUnit,
    extract::schema_type_name,
    naming,
    syntax::{
        call_arguments, callee_identifier, callee_member, enclosing_function_name, node_text,
        parse_source, visit_nodes,
    },
};
use anyhow::Result;
use std::ops::Range;
use tree_sitter::Node;

struct Replacement {
    range: Range<usize>,
    text: String,
}

/// Names the anonymous fragments of the hook call sites in `source`.
///
/// `useFragment(ref, e.Post, shape)` becomes
/// `useFragment(ref, e.fragment("<Function>PostFragment", e.Post, shape))` and
/// `useQueryFragment(ref, shape)` becomes
/// `useQueryFragment(ref, e.queryFragment("<Function>QueryFragment", shape))`, the same names the
/// generated units are emitted under. Everything else is left as it is.
pub fn transform_hooks(source: &SourceUnit, config: &GeneratorConfig) -> Result<String> {
    let pattern = config.transform_skip_pattern.as_str();
    let skipped = !pattern.is_empty()
        && source
            .path
            .file_stem()
            .and_then(|v| v.to_str())
            .is_some_and(|v| v.contains(pattern));
    if skipped {
        log::debug!("Not transforming `{}`", source.path.display());
        return Ok(source.text.clone());
    }
    let text = source.text.as_str();
    let tree = parse_source(text, source.dialect(), &source.path)?;
    let mut replacements = Vec::new();
    visit_nodes(tree.root_node(), &mut |node| {
        if node.kind() != "call_expression" {
            return;
        }
        let replacement = match callee_identifier(text, node) {
            Some("useFragment") => fragment_replacement(text, node, config),
            Some("useQueryFragment") => query_fragment_replacement(text, node, config),
            _ => None,
        };
        replacements.extend(replacement);
    });
    replacements.sort_by_key(|v: &Replacement| v.range.start);
    let mut result = String::with_capacity(text.len() + replacements.len() * 48);
    let mut position = 0;
    for replacement in replacements {
        if replacement.range.start < position {
            log::debug!(
                "Not transforming the nested hook at byte {} of `{}`",
                replacement.range.start,
                source.path.display()
            );
            continue;
        }
        result.push_str(&text[position..replacement.range.start]);
        result.push_str(&replacement.text);
        position = replacement.range.end;
    }
    result.push_str(&text[position..]);
    Ok(result)
}

fn fragment_replacement(
    text: &str,
    call: Node<'_>,
    config: &GeneratorConfig,
) -> Option<Replacement> {
    let root = config.root_binding.as_str();
    let args = call_arguments(call);
    let [_, expr, shape] = args[..] else {
        return None;
    };
    let type_name = schema_type_name(text, expr, root)?;
    let Some(function) = enclosing_function_name(text, call) else {
        log::debug!("Not transforming `useFragment` outside of a named function");
        return None;
    };
    let name = naming::fragment_name(function, naming::short_type_name(&type_name));
    Some(Replacement {
        range: expr.start_byte()..shape.end_byte(),
        text: naming::fragment_call(root, &name, node_text(text, expr), node_text(text, shape)),
    })
}

fn query_fragment_replacement(
    text: &str,
    call: Node<'_>,
    config: &GeneratorConfig,
) -> Option<Replacement> {
    let root = config.root_binding.as_str();
    let args = call_arguments(call);
    let [_, shape] = args[..] else {
        return None;
    };
    if callee_member(text, shape) == Some((root, "queryFragment")) {
        return None;
    }
    let Some(function) = enclosing_function_name(text, call) else {
        log::debug!("Not transforming `useQueryFragment` outside of a named function");
        return None;
    };
    let name = naming::query_fragment_name(function);
    Some(Replacement {
        range: shape.byte_range(),
        text: naming::query_fragment_call(root, &name, node_text(text, shape)),
    })
}
