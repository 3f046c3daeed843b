//! Read-only index over the document's named message and schema tables.
//!
//! Built once at the start of generation; every `$ref` in the pipeline
//! resolves through here.

use crate::error::GenerateError;
use crate::spec::{AsyncApiDoc, Message, MessageRef, Schema, SchemaKind};

use super::utils::ref_tail;

/// Read-only view over `components.messages` and `components.schemas`.
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    doc: &'a AsyncApiDoc,
}

impl<'a> Catalog<'a> {
    /// Build the catalog for a document.
    pub fn new(doc: &'a AsyncApiDoc) -> Self {
        Self { doc }
    }

    /// Resolve a schema `$ref` to the named schema it targets.
    pub fn resolve_schema(&self, ref_path: &str) -> Result<&'a Schema, GenerateError> {
        let name = ref_tail(ref_path);
        self.doc
            .components
            .as_ref()
            .and_then(|c| c.schemas.as_ref())
            .and_then(|schemas| schemas.get(name))
            .ok_or_else(|| GenerateError::ReferenceNotFound {
                reference: ref_path.to_string(),
            })
    }

    /// Resolve a message `$ref` to `(name, definition)`.
    pub fn resolve_message(&self, ref_path: &str) -> Result<(&'a str, &'a Message), GenerateError> {
        let name = ref_tail(ref_path);
        self.doc
            .components
            .as_ref()
            .and_then(|c| c.messages.as_ref())
            .and_then(|messages| messages.get_key_value(name))
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| GenerateError::ReferenceNotFound {
                reference: ref_path.to_string(),
            })
    }

    /// Dereference a message ref (inline or `$ref`) to `(name, definition)`.
    ///
    /// Inline messages must carry a `name`; an anonymous inline message cannot
    /// participate in dispatch.
    pub fn deref_message<'b>(
        &self,
        mref: &'b MessageRef,
    ) -> Result<(&'b str, &'b Message), GenerateError>
    where
        'a: 'b,
    {
        match mref {
            MessageRef::Ref { ref_path } => self.resolve_message(ref_path),
            MessageRef::Inline(message) => {
                let name = message
                    .name
                    .as_deref()
                    .ok_or_else(|| GenerateError::InvalidSchema {
                        context: "inline message without a name cannot be dispatched".to_string(),
                    })?;
                Ok((name, message))
            }
        }
    }

    /// All named messages in deterministic (sorted-name) order.
    pub fn all_messages(&self) -> Vec<(&'a str, &'a Message)> {
        let mut entries: Vec<_> = self
            .doc
            .components
            .as_ref()
            .and_then(|c| c.messages.as_ref())
            .map(|messages| {
                messages
                    .iter()
                    .map(|(k, v)| (k.as_str(), v))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Resolve the payload schema of a message, following a top-level `$ref`.
    ///
    /// Returns the schema plus the best display name for diagnostics (the ref
    /// target name when the payload is a ref, otherwise the message name).
    pub fn message_payload<'b>(
        &self,
        name: &'b str,
        message: &'b Message,
    ) -> Result<(&'b str, &'b Schema), GenerateError>
    where
        'a: 'b,
    {
        let payload = message
            .payload
            .as_ref()
            .ok_or_else(|| GenerateError::InvalidSchema {
                context: format!("message '{name}' has no payload schema"),
            })?;
        match payload.kind() {
            SchemaKind::Ref(ref_path) => {
                let target = self.resolve_schema(ref_path)?;
                Ok((ref_tail(ref_path), target))
            }
            _ => Ok((name, payload)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn doc() -> AsyncApiDoc {
        AsyncApiDoc::from_json(
            r##"{
                "asyncapi": "2.5.0",
                "channels": {},
                "components": {
                    "schemas": {
                        "Ping": {
                            "type": "object",
                            "required": ["event"],
                            "properties": { "event": { "type": "string" } }
                        }
                    },
                    "messages": {
                        "Ping": {
                            "payload": { "$ref": "#/components/schemas/Ping" }
                        },
                        "Ad": { "payload": { "type": "object" } }
                    }
                }
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_schema() {
        let doc = doc();
        let catalog = Catalog::new(&doc);
        assert!(catalog.resolve_schema("#/components/schemas/Ping").is_ok());
        let err = catalog
            .resolve_schema("#/components/schemas/Missing")
            .unwrap_err();
        assert!(matches!(err, GenerateError::ReferenceNotFound { .. }));
    }

    #[test]
    fn test_resolve_message_and_payload() {
        let doc = doc();
        let catalog = Catalog::new(&doc);
        let (name, message) = catalog.resolve_message("#/components/messages/Ping").unwrap();
        assert_eq!(name, "Ping");
        let (display, schema) = catalog.message_payload(name, message).unwrap();
        assert_eq!(display, "Ping");
        assert!(matches!(schema.kind(), SchemaKind::Object(_)));
    }

    #[test]
    fn test_all_messages_sorted() {
        let doc = doc();
        let catalog = Catalog::new(&doc);
        let names: Vec<_> = catalog.all_messages().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["Ad", "Ping"]);
    }
}
