//! Common naming and schema-display helpers shared across the IR pipeline.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::spec::{Schema, SchemaKind};

/// Identifiers that cannot be used as generated member names.
static RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "as", "async", "await", "break", "const", "continue", "else", "enum", "false", "fn",
        "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "return",
        "self", "static", "struct", "super", "trait", "true", "type", "use", "where", "while",
    ]
    .into_iter()
    .collect()
});

/// Extract the trailing name from a `$ref` path.
///
/// Handles both `#/components/schemas/Name` and `#/components/messages/Name`;
/// anything else falls back to the segment after the last slash.
pub fn ref_tail(ref_path: &str) -> &str {
    ref_path
        .strip_prefix("#/components/schemas/")
        .or_else(|| ref_path.strip_prefix("#/components/messages/"))
        .or_else(|| ref_path.rsplit('/').next())
        .unwrap_or(ref_path)
}

/// Capitalize the first letter of a string.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Convert a name to snake_case, splitting on case changes and separators.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_was_sep = false;
    for (i, c) in s.chars().enumerate() {
        if c == '-' || c == '.' || c == ' ' || c == '_' {
            if !result.is_empty() && !prev_was_sep {
                result.push('_');
            }
            prev_was_sep = true;
        } else if c.is_ascii_uppercase() {
            if i > 0 && !prev_was_sep && !result.ends_with('_') {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_was_sep = false;
        } else {
            result.push(c);
            prev_was_sep = false;
        }
    }
    result
}

/// Convert a name to PascalCase for type declarations.
pub fn to_pascal_case(s: &str) -> String {
    s.split(['-', '.', ' ', '_'])
        .filter(|part| !part.is_empty())
        .map(capitalize_first)
        .collect()
}

/// Sanitize a name into a usable generated identifier.
///
/// Converts to snake_case, prefixes a leading digit, and escapes reserved
/// words with an underscore.
pub fn sanitize_identifier(name: &str) -> String {
    if name.is_empty() {
        return "_empty".to_string();
    }
    let mut result = to_snake_case(name);
    if result.is_empty() {
        return "_empty".to_string();
    }
    if result
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
    {
        result = format!("_{result}");
    }
    if RESERVED_WORDS.contains(result.as_str()) {
        result = format!("_{result}");
    }
    result
}

/// Abstract display type for a field schema, used in message-type declarations.
///
/// Refs resolve to the referenced type name; composites collapse to a coarse
/// label since the emission layer re-expands them from the catalog.
pub fn schema_display_type(schema: &Schema) -> String {
    match schema.kind() {
        SchemaKind::Ref(ref_path) => to_pascal_case(ref_tail(ref_path)),
        SchemaKind::OneOf(_) => "union".to_string(),
        SchemaKind::AllOf(_) => "composite".to_string(),
        SchemaKind::Object(_) => "object".to_string(),
        SchemaKind::Primitive("array") => {
            let item = schema
                .items
                .as_deref()
                .map_or_else(|| "unknown".to_string(), schema_display_type);
            format!("array<{item}>")
        }
        SchemaKind::Primitive(t) => t.to_string(),
        SchemaKind::Unspecified => "unknown".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_tail() {
        assert_eq!(ref_tail("#/components/schemas/Ping"), "Ping");
        assert_eq!(ref_tail("#/components/messages/PongMessage"), "PongMessage");
        assert_eq!(ref_tail("Plain"), "Plain");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Ping"), "ping");
        assert_eq!(to_snake_case("ChatMessage"), "chat_message");
        assert_eq!(to_snake_case("chat-message"), "chat_message");
        assert_eq!(to_snake_case("chat message"), "chat_message");
        assert_eq!(to_snake_case("itemId"), "item_id");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("chat message"), "ChatMessage");
        assert_eq!(to_pascal_case("pong"), "Pong");
        assert_eq!(to_pascal_case("chat-api"), "ChatApi");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Ping"), "ping");
        assert_eq!(sanitize_identifier("type"), "_type");
        assert_eq!(sanitize_identifier("123go"), "_123go");
        assert_eq!(sanitize_identifier(""), "_empty");
    }

    #[test]
    fn test_schema_display_type() {
        let s: Schema = serde_json::from_str(
            r##"{ "type": "array", "items": { "$ref": "#/components/schemas/Item" } }"##,
        )
        .unwrap();
        assert_eq!(schema_display_type(&s), "array<Item>");
    }
}
