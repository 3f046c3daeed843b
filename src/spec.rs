//! AsyncAPI specification structs for serde deserialization.
//!
//! This module defines the minimal subset of AsyncAPI 2.x (WebSocket flavor)
//! that the generator needs: one channel with publish/subscribe operations,
//! named message/schema component tables, and the dispatcher extensions that
//! drive message routing over the single socket.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::GenerateError;

/// Root AsyncAPI document.
#[derive(Debug, Deserialize)]
pub struct AsyncApiDoc {
    /// AsyncAPI version string (e.g. "2.5.0").
    pub asyncapi: Option<String>,
    /// Document info block.
    pub info: Option<Info>,
    /// Named servers.
    #[serde(default)]
    pub servers: HashMap<String, Server>,
    /// Named channels. Exactly one is supported per generated client.
    #[serde(default)]
    pub channels: HashMap<String, Channel>,
    /// Reusable components (schemas, messages, security schemes).
    pub components: Option<Components>,
    /// Discriminator field name used to route inbound messages.
    #[serde(rename = "x-dispatcherKey")]
    pub dispatcher_key: Option<String>,
    /// Optional correlation-id field name enabling per-call multiplexing.
    #[serde(rename = "x-dispatcherStreamId")]
    pub dispatcher_stream_id: Option<String>,
}

/// Document info block.
#[derive(Debug, Deserialize)]
pub struct Info {
    /// API title, used to derive the client name.
    pub title: Option<String>,
    /// API version.
    pub version: Option<String>,
    /// API description.
    pub description: Option<String>,
}

/// A server entry with a URL template.
#[derive(Debug, Deserialize)]
pub struct Server {
    /// URL template, e.g. `ws://{host}:{port}/chat`.
    pub url: String,
    /// Transport protocol (expected `ws` or `wss`).
    pub protocol: Option<String>,
    /// Template variables referenced by the URL.
    #[serde(default)]
    pub variables: HashMap<String, ServerVariable>,
    /// Security requirements naming component security schemes.
    pub security: Option<Vec<HashMap<String, Vec<String>>>>,
}

/// A server URL template variable.
#[derive(Debug, Deserialize)]
pub struct ServerVariable {
    /// Default value substituted into the URL template.
    pub default: Option<String>,
    /// Allowed values.
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    /// Variable description.
    pub description: Option<String>,
}

/// A channel carrying the publish/subscribe operation pair.
#[derive(Debug, Deserialize)]
pub struct Channel {
    /// Client-to-server operation.
    pub publish: Option<OperationSpec>,
    /// Server-to-client operation.
    pub subscribe: Option<OperationSpec>,
    /// Path template parameters.
    pub parameters: Option<HashMap<String, ChannelParameter>>,
    /// Protocol bindings (ws query/header schemas).
    pub bindings: Option<ChannelBindings>,
}

/// A channel path parameter.
#[derive(Debug, Deserialize)]
pub struct ChannelParameter {
    /// Parameter description.
    pub description: Option<String>,
    /// Parameter schema.
    pub schema: Option<Schema>,
}

/// Channel protocol bindings.
#[derive(Debug, Deserialize)]
pub struct ChannelBindings {
    /// WebSocket binding.
    pub ws: Option<WsBinding>,
}

/// WebSocket channel binding carrying handshake parameter schemas.
#[derive(Debug, Deserialize)]
pub struct WsBinding {
    /// Query parameter object schema.
    pub query: Option<Schema>,
    /// Header parameter object schema.
    pub headers: Option<Schema>,
}

/// A publish or subscribe operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSpec {
    /// Operation identifier.
    pub operation_id: Option<String>,
    /// Operation summary.
    pub summary: Option<String>,
    /// The operation's message: a single message or a `oneOf` set.
    pub message: Option<MessageOrOneOf>,
}

/// A single message or an ordered `oneOf` set of messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageOrOneOf {
    /// Multiplexed set of messages over the one socket.
    OneOf {
        /// Ordered member list.
        #[serde(rename = "oneOf")]
        one_of: Vec<MessageRef>,
    },
    /// Exactly one message.
    Single(MessageRef),
}

impl MessageOrOneOf {
    /// View the message set as an ordered slice-like list of refs.
    pub fn members(&self) -> Vec<&MessageRef> {
        match self {
            MessageOrOneOf::OneOf { one_of } => one_of.iter().collect(),
            MessageOrOneOf::Single(m) => vec![m],
        }
    }
}

/// Reference to a message: a `$ref` into `components.messages` or inline.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageRef {
    /// `$ref` into the named-message table.
    Ref {
        /// Reference path, e.g. `#/components/messages/Ping`.
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    /// Inline message definition.
    Inline(Box<Message>),
}

/// A named message definition.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Message name (unique key in the message table).
    pub name: Option<String>,
    /// Payload schema.
    pub payload: Option<Schema>,
    /// Human-readable summary.
    pub summary: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Response annotation: which message(s) answer this one.
    #[serde(rename = "x-response")]
    pub response: Option<ResponseAnnotation>,
    /// Response mode marker: simple-rpc or server-streaming.
    #[serde(rename = "x-response-type")]
    pub response_type: Option<ResponseTypeMode>,
}

/// The `x-response` extension: a single message ref or a `oneOf` set.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseAnnotation {
    /// Single response message reference.
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    /// Union of possible response messages.
    #[serde(rename = "oneOf")]
    pub one_of: Option<Vec<MessageRef>>,
}

/// The `x-response-type` marker distinguishing reply cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ResponseTypeMode {
    /// Exactly one reply correlated to the request.
    #[serde(rename = "simple-rpc")]
    SimpleRpc,
    /// Unbounded sequence of replies.
    #[serde(rename = "server-streaming")]
    ServerStreaming,
}

/// Reusable components section.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// Named-schema table backing schema `$ref`s.
    pub schemas: Option<HashMap<String, Schema>>,
    /// Named-message table backing message `$ref`s.
    pub messages: Option<HashMap<String, Message>>,
    /// Security schemes referenced by servers.
    pub security_schemes: Option<HashMap<String, SecurityScheme>>,
}

/// A security scheme subset sufficient for auth-config extraction.
#[derive(Debug, Deserialize)]
pub struct SecurityScheme {
    /// Scheme type (`http`, `apiKey`, `userPassword`).
    #[serde(rename = "type")]
    pub scheme_type: String,
    /// HTTP scheme name (`bearer`).
    pub scheme: Option<String>,
    /// API key parameter name.
    pub name: Option<String>,
    /// API key location (`query`, `header`).
    #[serde(rename = "in")]
    pub location: Option<String>,
}

/// JSON Schema definition used in AsyncAPI payloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// The declared type (string, number, integer, boolean, object, array).
    #[serde(rename = "type")]
    pub schema_type: Option<String>,

    /// Reference to a named schema.
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    /// Properties for object types.
    pub properties: Option<HashMap<String, Schema>>,

    /// Required property names for object types.
    pub required: Option<Vec<String>>,

    /// Union type (exactly one of these schemas).
    #[serde(rename = "oneOf")]
    pub one_of: Option<Vec<Schema>>,

    /// Composition (all of these schemas combined).
    #[serde(rename = "allOf")]
    pub all_of: Option<Vec<Schema>>,

    /// Item schema for array types.
    pub items: Option<Box<Schema>>,

    /// Enum values for constrained strings.
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<serde_json::Value>>,

    /// Constant value.
    #[serde(rename = "const")]
    pub const_value: Option<serde_json::Value>,

    /// Format hint (e.g. uuid, date-time).
    pub format: Option<String>,

    /// Schema description.
    pub description: Option<String>,
}

/// The five logical schema kinds, recovered by exhaustive matching.
///
/// Composite markers win over a declared `type`; a bare property bag with no
/// declared type still counts as an object.
#[derive(Debug, Clone, Copy)]
pub enum SchemaKind<'a> {
    /// `$ref` into the named-schema table.
    Ref(&'a str),
    /// Ordered `oneOf` union.
    OneOf(&'a [Schema]),
    /// Ordered `allOf` composition.
    AllOf(&'a [Schema]),
    /// Plain object schema.
    Object(&'a Schema),
    /// Non-object leaf with a declared type.
    Primitive(&'a str),
    /// No type information at all.
    Unspecified,
}

impl Schema {
    /// Classify this schema into one of the five logical kinds.
    pub fn kind(&self) -> SchemaKind<'_> {
        if let Some(ref_path) = &self.ref_path {
            return SchemaKind::Ref(ref_path);
        }
        if let Some(one_of) = &self.one_of {
            return SchemaKind::OneOf(one_of);
        }
        if let Some(all_of) = &self.all_of {
            return SchemaKind::AllOf(all_of);
        }
        match self.schema_type.as_deref() {
            Some("object") => SchemaKind::Object(self),
            Some(other) => SchemaKind::Primitive(other),
            None if self.properties.is_some() => SchemaKind::Object(self),
            None => SchemaKind::Unspecified,
        }
    }

    /// Whether a property name appears in this object schema's `required` set.
    pub fn requires(&self, name: &str) -> bool {
        self.required
            .as_ref()
            .is_some_and(|r| r.iter().any(|n| n == name))
    }
}

impl AsyncApiDoc {
    /// Parse an AsyncAPI document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, GenerateError> {
        serde_json::from_str(json).map_err(|e| GenerateError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_kind_classification() {
        let obj: Schema = serde_json::from_str(
            r##"{ "type": "object", "properties": { "event": { "type": "string" } } }"##,
        )
        .unwrap();
        assert!(matches!(obj.kind(), SchemaKind::Object(_)));

        let bare_props: Schema =
            serde_json::from_str(r##"{ "properties": { "event": { "type": "string" } } }"##).unwrap();
        assert!(matches!(bare_props.kind(), SchemaKind::Object(_)));

        let prim: Schema = serde_json::from_str(r##"{ "type": "integer" }"##).unwrap();
        assert!(matches!(prim.kind(), SchemaKind::Primitive("integer")));

        let reference: Schema =
            serde_json::from_str(r##"{ "$ref": "#/components/schemas/Ping" }"##).unwrap();
        assert!(matches!(reference.kind(), SchemaKind::Ref(_)));

        let one_of: Schema =
            serde_json::from_str(r##"{ "oneOf": [ { "type": "object" } ] }"##).unwrap();
        assert!(matches!(one_of.kind(), SchemaKind::OneOf(_)));

        let unspecified: Schema = serde_json::from_str("{}").unwrap();
        assert!(matches!(unspecified.kind(), SchemaKind::Unspecified));
    }

    #[test]
    fn test_message_or_one_of_untagged() {
        let single: MessageOrOneOf =
            serde_json::from_str(r##"{ "$ref": "#/components/messages/Ping" }"##).unwrap();
        assert_eq!(single.members().len(), 1);

        let set: MessageOrOneOf = serde_json::from_str(
            r##"{ "oneOf": [
                { "$ref": "#/components/messages/Ping" },
                { "$ref": "#/components/messages/Subscribe" }
            ] }"##,
        )
        .unwrap();
        assert_eq!(set.members().len(), 2);
    }

    #[test]
    fn test_response_type_mode_values() {
        let simple: ResponseTypeMode = serde_json::from_str(r##""simple-rpc""##).unwrap();
        assert_eq!(simple, ResponseTypeMode::SimpleRpc);
        let streaming: ResponseTypeMode = serde_json::from_str(r##""server-streaming""##).unwrap();
        assert_eq!(streaming, ResponseTypeMode::ServerStreaming);
    }

    #[test]
    fn test_dispatcher_extensions_parse() {
        let doc = AsyncApiDoc::from_json(
            r##"{
                "asyncapi": "2.5.0",
                "x-dispatcherKey": "event",
                "x-dispatcherStreamId": "id",
                "channels": {}
            }"##,
        )
        .unwrap();
        assert_eq!(doc.dispatcher_key.as_deref(), Some("event"));
        assert_eq!(doc.dispatcher_stream_id.as_deref(), Some("id"));
    }
}
