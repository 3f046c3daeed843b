//! Error taxonomies for the generator and for generated clients.
//!
//! Specification errors ([`GenerateError`]) mean the document is
//! self-inconsistent; they abort generation with no partial output.
//! Runtime errors ([`ClientError`]) occur inside a running generated client
//! and are returned to the calling operation as typed failures.

use thiserror::Error;

/// Fatal errors detected while classifying or planning a document.
///
/// Every variant names the offending schema or message so the failure can be
/// traced back to the AsyncAPI source.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The document is not parseable as an AsyncAPI WebSocket spec.
    #[error("failed to parse AsyncAPI document: {0}")]
    Parse(String),

    /// The document-level `x-dispatcherKey` extension is missing or empty.
    #[error("x-dispatcherKey must be declared (and non-empty) at the document level")]
    NoDispatcherKey,

    /// The dispatcher field exists but is not string-typed.
    #[error("dispatcher key '{key}' must be a string inside '{schema}' properties, found '{found}'")]
    DispatcherType {
        /// Configured dispatcher key name.
        key: String,
        /// Schema the mis-typed field was found in.
        schema: String,
        /// Declared type of the offending property.
        found: String,
    },

    /// A dispatch-root payload does not declare the dispatcher field at all.
    #[error("dispatcher key '{key}' must be inside '{schema}' properties")]
    DispatcherMissing {
        /// Configured dispatcher key name.
        key: String,
        /// Payload schema lacking the field.
        schema: String,
    },

    /// The dispatcher field exists but is not listed in `required`.
    #[error("dispatcher key '{key}' must be a required property of '{schema}'")]
    DispatcherNotRequired {
        /// Configured dispatcher key name.
        key: String,
        /// Schema missing the required-ness.
        schema: String,
    },

    /// A schema participating in dispatch is not an object carrying the key.
    #[error("schema '{name}' must be an object schema carrying the dispatcher key")]
    SchemaMustBeObject {
        /// Name of the offending schema or oneOf branch.
        name: String,
    },

    /// A response payload is not a record-shaped schema.
    #[error("response '{name}' must be a record-shaped schema, found '{found}'")]
    ResponseMustBeRecord {
        /// Name of the offending response schema.
        name: String,
        /// What was found instead of a record.
        found: String,
    },

    /// A `oneOf` response set lacks the explicit `x-response-type` marker.
    #[error("message '{message}' declares a oneOf response without an x-response-type marker")]
    MissingResponseType {
        /// Message carrying the incomplete annotation.
        message: String,
    },

    /// This generator supports exactly one channel per client.
    #[error("exactly one channel is supported per client, document declares {count}")]
    MultipleChannelsUnsupported {
        /// Number of channels found.
        count: usize,
    },

    /// A `$ref` does not resolve against the document's named tables.
    #[error("reference '{reference}' does not resolve to a known schema or message")]
    ReferenceNotFound {
        /// The unresolved reference path.
        reference: String,
    },

    /// A schema is absent or structurally unusable where one was expected.
    #[error("invalid schema: {context}")]
    InvalidSchema {
        /// Human-readable description of where and why.
        context: String,
    },

    /// A `$ref` chain loops back onto itself.
    #[error("cyclic $ref chain detected through '{name}'")]
    CyclicReference {
        /// Schema name at which the cycle was detected.
        name: String,
    },
}

/// Runtime failures surfaced by generated clients.
///
/// These are recovered locally: background loops log and attempt a graceful
/// connection close, caller-invoked operations return the failure to their
/// caller. They never crash the host process.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection has been marked inactive.
    #[error("connection has been closed")]
    ConnectionClosed,

    /// A blocking produce/consume exceeded its caller-supplied timeout.
    #[error("operation timed out after {seconds} seconds")]
    Timeout {
        /// The timeout that elapsed, in decimal seconds.
        seconds: f64,
    },

    /// A payload or reply failed to decode into the declared type.
    #[error("failed to bind message to the declared type: {cause}")]
    DataBinding {
        /// Underlying decode failure.
        cause: String,
    },

    /// An internal pipe produce/consume failure distinct from timeout.
    #[error("pipe failure: {cause}")]
    PipeProtocol {
        /// Underlying pipe failure.
        cause: String,
    },

    /// A WebSocket transport failure.
    #[error("websocket transport failure: {cause}")]
    Transport {
        /// Underlying transport failure.
        cause: String,
    },
}
