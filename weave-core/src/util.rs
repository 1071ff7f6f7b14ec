use serde_json::Value;

/// Formats a long value for log and error messages, cutting it at 497 bytes.
#[macro_export]
macro_rules! truncate_long {
    ($text:expr) => {
        format_args!(
            "{}{}",
            &$text[..$crate::floor_char_boundary(&$text, 497)].trim_end(),
            if $text.len() > 497 { "..." } else { "" },
        )
    };
}

/// Largest char boundary not greater than `index`.
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut index = index;
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Renders a json value on a single line, truncated.
pub fn render_value(value: &Value) -> String {
    let text = value.to_string();
    format!("{}", truncate_long!(text))
}

/// Truthiness as understood by the query results producer.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(v) => *v,
        Value::Number(v) => v.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(v) => !v.is_empty(),
        Value::Array(..) | Value::Object(..) => true,
    }
}

/// The `id` of a record, when it is an object carrying a string id.
pub fn identity_of(value: &Value) -> Option<&str> {
    value.as_object()?.get("id")?.as_str()
}
