//! Names and texts of the declarations implied by the hook call sites.
//!
//! Extraction and the call-site transform both go through here, so the generated units and the
//! rewritten sources always agree.

pub fn fragment_name(function: &str, type_name: &str) -> String {
    format!("{function}{type_name}Fragment")
}

pub fn query_fragment_name(function: &str) -> String {
    format!("{function}QueryFragment")
}

pub fn query_name(function: &str) -> String {
    format!("{function}Query")
}

/// Text preceding the type expression in `e.fragment("Name", expr, shape)`.
pub fn fragment_call_prefix(root: &str, name: &str) -> String {
    format!("{root}.fragment(\"{name}\", ")
}

/// Text preceding the shape in `e.queryFragment("Name", shape)`.
pub fn query_fragment_call_prefix(root: &str, name: &str) -> String {
    format!("{root}.queryFragment(\"{name}\", ")
}

pub fn fragment_call(root: &str, name: &str, expr: &str, shape: &str) -> String {
    format!("{}{expr}, {shape})", fragment_call_prefix(root, name))
}

pub fn query_fragment_call(root: &str, name: &str, shape: &str) -> String {
    format!("{}{shape})", query_fragment_call_prefix(root, name))
}

/// Whether `name` can be used as a binding in the generated units.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Last segment of a possibly module qualified type name.
pub fn short_type_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}
