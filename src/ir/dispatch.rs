//! Dispatcher-key resolution over the schema graph.
//!
//! Every message multiplexed over the single socket must carry the configured
//! discriminator field as a required string property so the read loop can
//! route it. [`dispatcher_present`] walks a schema (object / oneOf / allOf /
//! `$ref`) and validates exactly that, with one explicit `Result` channel for
//! both the positive and negative outcomes.
//!
//! Composition semantics are deliberate and asymmetric:
//! - `oneOf`: at a dispatch root, every branch must carry the key (each branch
//!   is a routable message shape on its own).
//! - `allOf`: it is enough that one member carries the key (inclusion via
//!   composition), matching the upstream annotation convention.
//!
//! `$ref` chains are walked with an in-progress set; a cycle fails with
//! [`GenerateError::CyclicReference`] instead of recursing forever.

use std::collections::HashSet;

use crate::error::GenerateError;
use crate::spec::{Schema, SchemaKind};

use super::catalog::Catalog;
use super::utils::ref_tail;

/// Check whether `schema` carries the dispatcher field `key` as a required
/// string property.
///
/// `top_level` is true when validating a message payload that must carry the
/// dispatcher (publish request roots and resolved response schemas) and false
/// during nested composite traversal. At the top level a `oneOf` branch that
/// lacks the key is an error naming that branch; nested lookups simply report
/// absence through the return value.
pub fn dispatcher_present(
    catalog: &Catalog<'_>,
    schema: &Schema,
    schema_name: &str,
    key: &str,
    top_level: bool,
) -> Result<bool, GenerateError> {
    let mut visiting = HashSet::new();
    check(catalog, schema, schema_name, key, top_level, &mut visiting)
}

fn check(
    catalog: &Catalog<'_>,
    schema: &Schema,
    name: &str,
    key: &str,
    top_level: bool,
    visiting: &mut HashSet<String>,
) -> Result<bool, GenerateError> {
    match schema.kind() {
        SchemaKind::Ref(ref_path) => {
            let target_name = ref_tail(ref_path);
            if !visiting.insert(target_name.to_string()) {
                return Err(GenerateError::CyclicReference {
                    name: target_name.to_string(),
                });
            }
            let target = catalog.resolve_schema(ref_path)?;
            let result = check(catalog, target, target_name, key, top_level, visiting);
            visiting.remove(target_name);
            result
        }
        SchemaKind::Object(obj) => match obj.properties.as_ref().and_then(|p| p.get(key)) {
            Some(prop) => {
                let found = declared_leaf_type(catalog, prop, visiting)?;
                if found != "string" {
                    return Err(GenerateError::DispatcherType {
                        key: key.to_string(),
                        schema: name.to_string(),
                        found,
                    });
                }
                if !obj.requires(key) {
                    return Err(GenerateError::DispatcherNotRequired {
                        key: key.to_string(),
                        schema: name.to_string(),
                    });
                }
                Ok(true)
            }
            None => Ok(false),
        },
        SchemaKind::OneOf(branches) => {
            for (idx, branch) in branches.iter().enumerate() {
                let branch_name = branch_name(branch, name, idx);
                let found = check(catalog, branch, &branch_name, key, top_level, visiting)?;
                if top_level && !found {
                    return Err(GenerateError::SchemaMustBeObject { name: branch_name });
                }
            }
            Ok(true)
        }
        SchemaKind::AllOf(members) => {
            for (idx, member) in members.iter().enumerate() {
                let member_name = branch_name(member, name, idx);
                if check(catalog, member, &member_name, key, false, visiting)? {
                    return Ok(true);
                }
            }
            Err(GenerateError::SchemaMustBeObject {
                name: name.to_string(),
            })
        }
        SchemaKind::Primitive(declared) => Err(GenerateError::ResponseMustBeRecord {
            name: name.to_string(),
            found: declared.to_string(),
        }),
        SchemaKind::Unspecified => Err(GenerateError::InvalidSchema {
            context: format!("schema '{name}' carries no type information"),
        }),
    }
}

/// Display name for a composite branch: the ref target when it is a `$ref`,
/// otherwise a positional label under the parent.
fn branch_name(branch: &Schema, parent: &str, idx: usize) -> String {
    match branch.kind() {
        SchemaKind::Ref(ref_path) => ref_tail(ref_path).to_string(),
        _ => format!("{parent}[{idx}]"),
    }
}

/// Resolve a property schema down to its declared leaf type name.
fn declared_leaf_type(
    catalog: &Catalog<'_>,
    schema: &Schema,
    visiting: &mut HashSet<String>,
) -> Result<String, GenerateError> {
    match schema.kind() {
        SchemaKind::Ref(ref_path) => {
            let target_name = ref_tail(ref_path);
            if !visiting.insert(target_name.to_string()) {
                return Err(GenerateError::CyclicReference {
                    name: target_name.to_string(),
                });
            }
            let target = catalog.resolve_schema(ref_path)?;
            let result = declared_leaf_type(catalog, target, visiting);
            visiting.remove(target_name);
            result
        }
        SchemaKind::OneOf(_) => Ok("oneOf".to_string()),
        SchemaKind::AllOf(_) => Ok("allOf".to_string()),
        SchemaKind::Object(_) => Ok("object".to_string()),
        SchemaKind::Primitive(t) => Ok(t.to_string()),
        SchemaKind::Unspecified => Ok("unspecified".to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::spec::AsyncApiDoc;

    fn doc_with_schemas(schemas: &str) -> AsyncApiDoc {
        AsyncApiDoc::from_json(&format!(
            r##"{{
                "asyncapi": "2.5.0",
                "channels": {{}},
                "components": {{ "schemas": {schemas} }}
            }}"##,
        ))
        .unwrap()
    }

    fn schema(json: &str) -> Schema {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_object_with_valid_dispatcher() {
        let doc = doc_with_schemas("{}");
        let catalog = Catalog::new(&doc);
        let s = schema(
            r##"{
                "type": "object",
                "required": ["event"],
                "properties": { "event": { "type": "string" } }
            }"##,
        );
        assert!(dispatcher_present(&catalog, &s, "Ping", "event", true).unwrap());
    }

    #[test]
    fn test_object_without_field_returns_false() {
        let doc = doc_with_schemas("{}");
        let catalog = Catalog::new(&doc);
        let s = schema(r##"{ "type": "object", "properties": { "other": { "type": "string" } } }"##);
        assert!(!dispatcher_present(&catalog, &s, "Ping", "event", true).unwrap());
    }

    #[test]
    fn test_non_string_dispatcher_fails() {
        let doc = doc_with_schemas("{}");
        let catalog = Catalog::new(&doc);
        let s = schema(
            r##"{
                "type": "object",
                "required": ["event"],
                "properties": { "event": { "type": "integer" } }
            }"##,
        );
        let err = dispatcher_present(&catalog, &s, "Ping", "event", true).unwrap_err();
        assert!(
            matches!(err, GenerateError::DispatcherType { found, .. } if found == "integer")
        );
    }

    #[test]
    fn test_not_required_dispatcher_fails() {
        let doc = doc_with_schemas("{}");
        let catalog = Catalog::new(&doc);
        let s = schema(
            r##"{ "type": "object", "properties": { "event": { "type": "string" } } }"##,
        );
        let err = dispatcher_present(&catalog, &s, "Ping", "event", true).unwrap_err();
        assert!(matches!(err, GenerateError::DispatcherNotRequired { .. }));
    }

    #[test]
    fn test_one_of_all_branches_valid() {
        let doc = doc_with_schemas(
            r##"{
                "A": { "type": "object", "required": ["event"], "properties": { "event": { "type": "string" } } },
                "B": { "type": "object", "required": ["event"], "properties": { "event": { "type": "string" } } }
            }"##,
        );
        let catalog = Catalog::new(&doc);
        let s = schema(
            r##"{ "oneOf": [
                { "$ref": "#/components/schemas/A" },
                { "$ref": "#/components/schemas/B" }
            ] }"##,
        );
        assert!(dispatcher_present(&catalog, &s, "Union", "event", true).unwrap());
    }

    #[test]
    fn test_one_of_branch_lacking_key_fails_at_top_level() {
        let doc = doc_with_schemas(
            r##"{
                "A": { "type": "object", "required": ["event"], "properties": { "event": { "type": "string" } } },
                "Bare": { "type": "object", "properties": { "other": { "type": "string" } } }
            }"##,
        );
        let catalog = Catalog::new(&doc);
        let s = schema(
            r##"{ "oneOf": [
                { "$ref": "#/components/schemas/A" },
                { "$ref": "#/components/schemas/Bare" }
            ] }"##,
        );
        let err = dispatcher_present(&catalog, &s, "Union", "event", true).unwrap_err();
        assert!(matches!(err, GenerateError::SchemaMustBeObject { name } if name == "Bare"));
    }

    #[test]
    fn test_all_of_or_semantics() {
        // One matching member next to one non-matching member succeeds.
        let doc = doc_with_schemas(
            r##"{
                "WithKey": { "type": "object", "required": ["event"], "properties": { "event": { "type": "string" } } },
                "Extra": { "type": "object", "properties": { "note": { "type": "string" } } }
            }"##,
        );
        let catalog = Catalog::new(&doc);
        let s = schema(
            r##"{ "allOf": [
                { "$ref": "#/components/schemas/Extra" },
                { "$ref": "#/components/schemas/WithKey" }
            ] }"##,
        );
        assert!(dispatcher_present(&catalog, &s, "Composed", "event", true).unwrap());
    }

    #[test]
    fn test_all_of_no_member_matches_fails() {
        let doc = doc_with_schemas(
            r##"{ "Extra": { "type": "object", "properties": { "note": { "type": "string" } } } }"##,
        );
        let catalog = Catalog::new(&doc);
        let s = schema(r##"{ "allOf": [ { "$ref": "#/components/schemas/Extra" } ] }"##);
        let err = dispatcher_present(&catalog, &s, "Composed", "event", true).unwrap_err();
        assert!(matches!(err, GenerateError::SchemaMustBeObject { .. }));
    }

    #[test]
    fn test_primitive_leaf_fails() {
        let doc = doc_with_schemas("{}");
        let catalog = Catalog::new(&doc);
        let s = schema(r##"{ "type": "integer" }"##);
        let err = dispatcher_present(&catalog, &s, "Count", "event", true).unwrap_err();
        assert!(
            matches!(err, GenerateError::ResponseMustBeRecord { found, .. } if found == "integer")
        );
    }

    #[test]
    fn test_cyclic_ref_detected() {
        let doc = doc_with_schemas(
            r##"{
                "Loop": { "allOf": [ { "$ref": "#/components/schemas/Loop" } ] }
            }"##,
        );
        let catalog = Catalog::new(&doc);
        let s = schema(r##"{ "$ref": "#/components/schemas/Loop" }"##);
        let err = dispatcher_present(&catalog, &s, "Loop", "event", true).unwrap_err();
        assert!(matches!(err, GenerateError::CyclicReference { name } if name == "Loop"));
    }

    #[test]
    fn test_unresolved_ref_fails() {
        let doc = doc_with_schemas("{}");
        let catalog = Catalog::new(&doc);
        let s = schema(r##"{ "$ref": "#/components/schemas/Missing" }"##);
        let err = dispatcher_present(&catalog, &s, "Missing", "event", true).unwrap_err();
        assert!(matches!(err, GenerateError::ReferenceNotFound { .. }));
    }
}
