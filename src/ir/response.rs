//! Return-type reconciliation for response annotations.
//!
//! Given a message's `x-response` annotation, resolves the set of possible
//! reply messages, validates that each reply payload carries the dispatcher
//! key, and reports the reconciled union plus the streaming flag. Pure
//! function of the annotation and catalog, so resolving twice yields the
//! identical ordered type-name sequence.

use crate::error::GenerateError;
use crate::spec::{Message, ResponseTypeMode, SchemaKind};

use super::catalog::Catalog;
use super::plan::ResolvedResponse;
use super::utils::to_pascal_case;

/// Resolve a message's response annotation into the reconciled reply union.
///
/// Returns `Ok(None)` for the sentinel "no explicit data" contract: either no
/// annotation at all, or an annotation whose members are all close-frame
/// sentinels (a `oneOf` emptied by close-frame exclusion becomes absent, not
/// an empty union).
pub fn resolve_return_type(
    catalog: &Catalog<'_>,
    message_name: &str,
    message: &Message,
    dispatcher_key: &str,
) -> Result<Option<ResolvedResponse>, GenerateError> {
    let Some(annotation) = &message.response else {
        return Ok(None);
    };

    if let Some(one_of) = &annotation.one_of {
        // A multi-reply union is ambiguous without the explicit marker.
        let mode = message
            .response_type
            .ok_or_else(|| GenerateError::MissingResponseType {
                message: message_name.to_string(),
            })?;

        let mut type_names = Vec::new();
        for member in one_of {
            let (name, definition) = catalog.deref_message(member)?;
            if is_close_frame(catalog, name, definition) {
                continue;
            }
            validate_response_message(catalog, name, definition, dispatcher_key)?;
            type_names.push(to_pascal_case(name));
        }
        if type_names.is_empty() {
            return Ok(None);
        }
        return Ok(Some(ResolvedResponse {
            type_names,
            streaming: mode == ResponseTypeMode::ServerStreaming,
        }));
    }

    if let Some(ref_path) = &annotation.ref_path {
        let (name, definition) = catalog.resolve_message(ref_path)?;
        if is_close_frame(catalog, name, definition) {
            return Ok(None);
        }
        validate_response_message(catalog, name, definition, dispatcher_key)?;
        // Absent marker on a single ref defaults to one reply.
        let streaming = message.response_type == Some(ResponseTypeMode::ServerStreaming);
        return Ok(Some(ResolvedResponse {
            type_names: vec![to_pascal_case(name)],
            streaming,
        }));
    }

    Err(GenerateError::ResponseMustBeRecord {
        name: message_name.to_string(),
        found: "empty x-response annotation".to_string(),
    })
}

/// Validate that a response message resolves to a record-shaped payload
/// carrying the dispatcher key.
fn validate_response_message(
    catalog: &Catalog<'_>,
    name: &str,
    message: &Message,
    dispatcher_key: &str,
) -> Result<(), GenerateError> {
    let (display_name, payload) = catalog.message_payload(name, message)?;
    match payload.kind() {
        SchemaKind::Object(_) | SchemaKind::OneOf(_) | SchemaKind::AllOf(_) => {}
        SchemaKind::Primitive(found) => {
            return Err(GenerateError::ResponseMustBeRecord {
                name: display_name.to_string(),
                found: found.to_string(),
            });
        }
        SchemaKind::Ref(_) | SchemaKind::Unspecified => {
            return Err(GenerateError::InvalidSchema {
                context: format!("response '{display_name}' payload is not a usable schema"),
            });
        }
    }
    if !super::dispatch::dispatcher_present(catalog, payload, display_name, dispatcher_key, true)? {
        return Err(GenerateError::DispatcherMissing {
            key: dispatcher_key.to_string(),
            schema: display_name.to_string(),
        });
    }
    Ok(())
}

/// Whether a message is the connection-termination sentinel.
///
/// Recognized by conventional name (`CloseFrame` / `CloseFrameBody`) or by
/// shape: an object payload declaring both `statusCode` and `reason`
/// properties, the WebSocket close-frame body.
pub fn is_close_frame(catalog: &Catalog<'_>, name: &str, message: &Message) -> bool {
    if name == "CloseFrame" || name == "CloseFrameBody" {
        return true;
    }
    let Ok((payload_name, payload)) = catalog.message_payload(name, message) else {
        return false;
    };
    if payload_name == "CloseFrame" || payload_name == "CloseFrameBody" {
        return true;
    }
    payload.properties.as_ref().is_some_and(|props| {
        props.contains_key("statusCode") && props.contains_key("reason")
    })
}

/// Reconciled external return-type expression for a response union.
///
/// Joins the union members with an or-error suffix; streaming responses are
/// wrapped as an unbounded sequence with an explicit end-of-stream/error
/// tail. Display-only helper for emission layers and diagnostics.
pub fn return_type_expression(resolved: Option<&ResolvedResponse>) -> String {
    match resolved {
        None => "()|error".to_string(),
        Some(r) => {
            let union = r.type_names.join("|");
            if r.streaming {
                format!("stream<{union}, error?>")
            } else {
                format!("{union}|error")
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::spec::AsyncApiDoc;

    fn doc(components: &str) -> AsyncApiDoc {
        AsyncApiDoc::from_json(&format!(
            r##"{{ "asyncapi": "2.5.0", "channels": {{}}, "components": {components} }}"##
        ))
        .unwrap()
    }

    const PONG_COMPONENTS: &str = r##"{
        "schemas": {
            "Pong": {
                "type": "object",
                "required": ["event"],
                "properties": { "event": { "type": "string" } }
            },
            "Tick": {
                "type": "object",
                "required": ["event"],
                "properties": { "event": { "type": "string" } }
            },
            "Bare": {
                "type": "object",
                "properties": { "detail": { "type": "string" } }
            },
            "CloseFrameBody": {
                "type": "object",
                "properties": {
                    "statusCode": { "type": "integer" },
                    "reason": { "type": "string" }
                }
            }
        },
        "messages": {
            "Pong": { "payload": { "$ref": "#/components/schemas/Pong" } },
            "Tick": { "payload": { "$ref": "#/components/schemas/Tick" } },
            "Bare": { "payload": { "$ref": "#/components/schemas/Bare" } },
            "Goodbye": { "payload": { "$ref": "#/components/schemas/CloseFrameBody" } }
        }
    }"##;

    fn message(json: &str) -> Message {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_no_annotation_is_sentinel() {
        let doc = doc(PONG_COMPONENTS);
        let catalog = Catalog::new(&doc);
        let m = message(r##"{ "payload": { "type": "object" } }"##);
        assert!(resolve_return_type(&catalog, "Ping", &m, "event")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_single_ref_resolution() {
        let doc = doc(PONG_COMPONENTS);
        let catalog = Catalog::new(&doc);
        let m = message(r##"{ "x-response": { "$ref": "#/components/messages/Pong" } }"##);
        let resolved = resolve_return_type(&catalog, "Ping", &m, "event")
            .unwrap()
            .unwrap();
        assert_eq!(resolved.type_names, vec!["Pong".to_string()]);
        assert!(!resolved.streaming);
    }

    #[test]
    fn test_one_of_requires_mode_marker() {
        let doc = doc(PONG_COMPONENTS);
        let catalog = Catalog::new(&doc);
        let m = message(
            r##"{ "x-response": { "oneOf": [
                { "$ref": "#/components/messages/Pong" },
                { "$ref": "#/components/messages/Tick" }
            ] } }"##,
        );
        let err = resolve_return_type(&catalog, "Ping", &m, "event").unwrap_err();
        assert!(matches!(err, GenerateError::MissingResponseType { message } if message == "Ping"));
    }

    #[test]
    fn test_one_of_union_ordered() {
        let doc = doc(PONG_COMPONENTS);
        let catalog = Catalog::new(&doc);
        let m = message(
            r##"{
                "x-response": { "oneOf": [
                    { "$ref": "#/components/messages/Pong" },
                    { "$ref": "#/components/messages/Tick" }
                ] },
                "x-response-type": "server-streaming"
            }"##,
        );
        let resolved = resolve_return_type(&catalog, "Ping", &m, "event")
            .unwrap()
            .unwrap();
        assert_eq!(
            resolved.type_names,
            vec!["Pong".to_string(), "Tick".to_string()]
        );
        assert!(resolved.streaming);
    }

    #[test]
    fn test_idempotent_resolution() {
        let doc = doc(PONG_COMPONENTS);
        let catalog = Catalog::new(&doc);
        let m = message(
            r##"{
                "x-response": { "oneOf": [
                    { "$ref": "#/components/messages/Tick" },
                    { "$ref": "#/components/messages/Pong" }
                ] },
                "x-response-type": "simple-rpc"
            }"##,
        );
        let first = resolve_return_type(&catalog, "Ping", &m, "event").unwrap();
        let second = resolve_return_type(&catalog, "Ping", &m, "event").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_close_frame_exclusion_empties_to_absent() {
        let doc = doc(PONG_COMPONENTS);
        let catalog = Catalog::new(&doc);
        let m = message(
            r##"{
                "x-response": { "oneOf": [ { "$ref": "#/components/messages/Goodbye" } ] },
                "x-response-type": "simple-rpc"
            }"##,
        );
        assert!(resolve_return_type(&catalog, "Ping", &m, "event")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_response_without_dispatcher_key_fails() {
        let doc = doc(PONG_COMPONENTS);
        let catalog = Catalog::new(&doc);
        let m = message(r##"{ "x-response": { "$ref": "#/components/messages/Bare" } }"##);
        let err = resolve_return_type(&catalog, "Ping", &m, "event").unwrap_err();
        assert!(matches!(
            err,
            GenerateError::DispatcherMissing { key, schema } if key == "event" && schema == "Bare"
        ));
    }

    #[test]
    fn test_empty_annotation_fails() {
        let doc = doc(PONG_COMPONENTS);
        let catalog = Catalog::new(&doc);
        let m = message(r##"{ "x-response": {} }"##);
        let err = resolve_return_type(&catalog, "Ping", &m, "event").unwrap_err();
        assert!(matches!(err, GenerateError::ResponseMustBeRecord { .. }));
    }

    #[test]
    fn test_return_type_expression() {
        assert_eq!(return_type_expression(None), "()|error");
        let simple = ResolvedResponse {
            type_names: vec!["Pong".into(), "Tick".into()],
            streaming: false,
        };
        assert_eq!(return_type_expression(Some(&simple)), "Pong|Tick|error");
        let streaming = ResolvedResponse {
            type_names: vec!["Tick".into()],
            streaming: true,
        };
        assert_eq!(
            return_type_expression(Some(&streaming)),
            "stream<Tick, error?>"
        );
    }
}
