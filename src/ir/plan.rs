//! Generation-plan IR.
//!
//! This module defines the abstract output of the generator: an ordered
//! member list for the client plus per-operation body plans. No concrete
//! syntax is prescribed; the emission layer renders these into a target
//! language.

use crate::spec::ResponseTypeMode;

/// Pipe capacity for simple-RPC bindings (one in-flight reply).
pub const RPC_PIPE_CAPACITY: usize = 1;

/// Pipe capacity for streaming bindings (bounded backlog of pushed replies).
pub const STREAM_PIPE_CAPACITY: usize = 32;

/// Capacity of the single outbound write queue.
pub const WRITE_QUEUE_CAPACITY: usize = 64;

/// Process-wide dispatch configuration derived once per document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Discriminator field name, required on every dispatched message.
    pub key: String,
    /// Optional correlation-id field enabling per-call multiplexing.
    pub stream_id_key: Option<String>,
}

/// How a request expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Fire-and-forget, no reply.
    None,
    /// Exactly one reply.
    SimpleRpc,
    /// Unbounded sequence of replies.
    Streaming,
}

impl From<ResponseTypeMode> for ResponseMode {
    fn from(mode: ResponseTypeMode) -> Self {
        match mode {
            ResponseTypeMode::SimpleRpc => ResponseMode::SimpleRpc,
            ResponseTypeMode::ServerStreaming => ResponseMode::Streaming,
        }
    }
}

/// Reconciled response info produced by the return-type resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResponse {
    /// Ordered union of possible response payload type names.
    pub type_names: Vec<String>,
    /// Whether replies form an unbounded stream.
    pub streaming: bool,
}

/// Classified per-message seed, consumed exactly once by the planner.
#[derive(Debug, Clone)]
pub struct OperationSeed {
    /// Request (or push) message name.
    pub request_name: String,
    /// Human-readable summary carried into the plan.
    pub summary: Option<String>,
    /// Reconciled response, absent for fire-and-forget.
    pub response: Option<ResolvedResponse>,
    /// True iff the stream-id key is configured and the request carries it.
    pub uses_correlation_id: bool,
    /// True when this originates from a subscribe-only message.
    pub is_subscribe_push: bool,
}

/// How a pipe is keyed in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeKey {
    /// Static 1:1 binding under the request-type name.
    RequestType(String),
    /// Dynamic binding under a runtime correlation id.
    CorrelationId,
}

/// A logical queue binding between the read loop and a waiting consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeBinding {
    /// Generated pipe identifier, e.g. `ping_pipe`.
    pub pipe_name: String,
    /// Registry key discipline.
    pub key: PipeKey,
    /// Bounded capacity.
    pub capacity: usize,
}

/// One step in a remote operation's body plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyStep {
    /// Reject with `ConnectionClosed` if the socket is marked inactive.
    CheckConnectionActive,
    /// Stamp a fresh UUID onto the outgoing payload under `field`.
    GenerateCorrelationId {
        /// The configured stream-id field name.
        field: String,
    },
    /// Register a pipe in the registry before anything is sent.
    RegisterPipe {
        /// Pipe identifier.
        pipe: String,
        /// Registry key discipline.
        key: PipeKey,
        /// Bounded capacity.
        capacity: usize,
    },
    /// Enqueue the converted request onto the single outbound write queue.
    ProduceRequest,
    /// Block on exactly one reply from the pipe within the caller timeout.
    ConsumeReply {
        /// Pipe identifier.
        pipe: String,
    },
    /// Decode the raw reply into the declared union type.
    DecodeReply {
        /// Union of possible reply type names.
        type_union: Vec<String>,
    },
    /// Remove a dynamic pipe from the registry.
    DeregisterPipe {
        /// Pipe identifier.
        pipe: String,
    },
    /// Construct the pull-based stream adapter over the pipe.
    BuildStreamAdapter {
        /// Pipe identifier.
        pipe: String,
        /// Union of per-item type names.
        item_union: Vec<String>,
    },
}

/// External return contract of a remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    /// No explicit data, error-only contract.
    UnitOrError,
    /// Union of reply type names, or error.
    UnionOrError(Vec<String>),
    /// Unbounded sequence of the union, with an end-of-stream/error tail.
    StreamOfUnionOrError(Vec<String>),
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    /// Parameter identifier.
    pub name: String,
    /// Abstract type name.
    pub type_name: String,
    /// Whether the parameter is required.
    pub required: bool,
}

/// Complete generation plan for one remote operation.
#[derive(Debug, Clone)]
pub struct OperationPlan {
    /// Request (or push) message name.
    pub request_name: String,
    /// Generated function identifier.
    pub fn_name: String,
    /// Human-readable summary.
    pub summary: Option<String>,
    /// Reply cardinality.
    pub response_mode: ResponseMode,
    /// Ordered union of possible response payload type names.
    pub response_type_union: Vec<String>,
    /// True iff a fresh correlation id is stamped per call.
    pub uses_correlation_id: bool,
    /// True when the operation is a pure server push.
    pub is_subscribe_push: bool,
    /// The pipe this operation consumes from, if any.
    pub pipe: Option<PipeBinding>,
    /// Parameter list (payload and timeout).
    pub params: Vec<ParamDecl>,
    /// Ordered body-statement plan.
    pub body: Vec<BodyStep>,
    /// External return contract.
    pub return_type: ReturnType,
}

/// One field declaration in a message type or on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field identifier.
    pub name: String,
    /// Abstract type name.
    pub type_name: String,
    /// Whether the field is required.
    pub required: bool,
}

/// A message-type declaration derived from a catalogued message payload.
#[derive(Debug, Clone)]
pub struct MessageTypeDecl {
    /// Type name.
    pub name: String,
    /// Documentation pulled from summary/description.
    pub description: Option<String>,
    /// Ordered field list.
    pub fields: Vec<FieldDecl>,
}

/// One step of the client's init plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// Validate and store the endpoint URL.
    ValidateUrl,
    /// Wire the configured auth scheme into the handshake.
    ConfigureAuth,
    /// Create the single outbound write queue.
    CreateWriteQueue,
    /// Create the pipe and stream-adapter registries.
    CreateRegistries,
    /// Open the WebSocket.
    OpenSocket,
    /// Spawn the background read loop.
    StartReadLoop,
    /// Spawn the background write loop.
    StartWriteLoop,
}

/// Init member plan.
#[derive(Debug, Clone)]
pub struct InitPlan {
    /// Ordered init steps.
    pub steps: Vec<InitStep>,
}

/// Routing rule applied by the read loop to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Dispatcher-key value observed on the decoded message.
    pub dispatcher_value: String,
    /// Pipe the message is forwarded to.
    pub target: PipeKey,
}

/// Background read-loop plan.
#[derive(Debug, Clone)]
pub struct ReadLoopPlan {
    /// Discriminator field inspected on each inbound frame.
    pub dispatcher_key: String,
    /// Correlation-id field inspected first, when configured.
    pub stream_id_key: Option<String>,
    /// Static routing table from dispatcher value to pipe.
    pub routes: Vec<RouteRule>,
}

/// Background write-loop plan.
#[derive(Debug, Clone)]
pub struct WriteLoopPlan {
    /// Name of the drained outbound queue.
    pub queue_name: String,
    /// Queue capacity.
    pub capacity: usize,
}

/// One step of the close plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStep {
    /// Flip the liveness flag (idempotence gate).
    MarkInactive,
    /// Close every registered stream adapter.
    CloseStreamAdapters,
    /// Close and drop every registered pipe.
    ClosePipes,
    /// Close the outbound write queue.
    CloseWriteQueue,
    /// Close the socket itself.
    CloseSocket,
}

/// Close member plan.
#[derive(Debug, Clone)]
pub struct ClosePlan {
    /// Ordered close steps.
    pub steps: Vec<CloseStep>,
}

/// An ordered client member declaration.
#[derive(Debug, Clone)]
pub enum MemberDecl {
    /// A client field.
    Field(FieldDecl),
    /// The init member.
    Init(InitPlan),
    /// The background read loop.
    ReadLoop(ReadLoopPlan),
    /// The background write loop.
    WriteLoop(WriteLoopPlan),
    /// A remote operation.
    RemoteOperation(OperationPlan),
    /// The explicit close operation.
    Close(ClosePlan),
}

/// Per-streaming-type adapter declaration.
#[derive(Debug, Clone)]
pub struct StreamAdapterDecl {
    /// Adapter type name, e.g. `MessageStream`.
    pub name: String,
    /// Union of per-item type names.
    pub item_union: Vec<String>,
}

/// How the generated client authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPlan {
    /// No authentication configured.
    None,
    /// HTTP bearer token on the handshake.
    BearerToken,
    /// Username/password pair.
    BasicAuth,
    /// API key parameter.
    ApiKey {
        /// Parameter name.
        name: String,
        /// `query` or `header`.
        location: String,
    },
}

/// The complete, ordered generation plan for one client.
#[derive(Debug, Clone)]
pub struct ClientPlan {
    /// Generated client type name.
    pub client_name: String,
    /// Dispatch configuration.
    pub dispatcher: DispatcherConfig,
    /// Resolved default endpoint URL.
    pub server_url: String,
    /// Auth configuration.
    pub auth: AuthPlan,
    /// Channel path parameters.
    pub path_params: Vec<ParamDecl>,
    /// WebSocket query parameters.
    pub query_params: Vec<ParamDecl>,
    /// WebSocket header parameters.
    pub header_params: Vec<ParamDecl>,
    /// Message-type declarations, deterministic order.
    pub message_types: Vec<MessageTypeDecl>,
    /// Internal raw-envelope record shapes the routing loops decode into.
    pub envelope_types: Vec<MessageTypeDecl>,
    /// Ordered member list: fields, init, loops, operations, close.
    pub members: Vec<MemberDecl>,
    /// Stream adapter declarations for streaming operations.
    pub stream_adapters: Vec<StreamAdapterDecl>,
}

impl ClientPlan {
    /// The remote operations in member order.
    pub fn operations(&self) -> Vec<&OperationPlan> {
        self.members
            .iter()
            .filter_map(|m| match m {
                MemberDecl::RemoteOperation(op) => Some(op),
                _ => None,
            })
            .collect()
    }

    /// The read-loop plan.
    pub fn read_loop(&self) -> Option<&ReadLoopPlan> {
        self.members.iter().find_map(|m| match m {
            MemberDecl::ReadLoop(plan) => Some(plan),
            _ => None,
        })
    }
}
