//! Intermediate representation for AsyncAPI to WebSocket-client generation.
//!
//! The pipeline runs in four stages:
//! 1. Catalog: named message/schema lookup with `$ref` resolution
//! 2. Classification: publish/subscribe reconciliation into operation seeds
//!    (dispatcher validation and return-type resolution happen here)
//! 3. Planning: per-seed body-statement plans with pipe bindings
//! 4. Assembly: the ordered [`ClientPlan`] with init, loop and close specs
//!
//! No concrete syntax is produced; the plan is an abstract description an
//! emission layer renders into a target language.
//!
//! ## Module Structure
//!
//! - `plan`: the generation-plan IR (operations, members, loops)
//! - `catalog`: message and schema tables behind `$ref` resolution
//! - `dispatch`: dispatcher-key presence validation over schema shapes
//! - `response`: `x-response` reconciliation into reply unions
//! - `classify`: channel-operation classification into seeds
//! - `planner`: seed to per-operation body plan
//! - `assemble`: whole-document client assembly
//! - `utils`: naming and display helpers

mod assemble;
mod catalog;
mod classify;
mod dispatch;
mod plan;
mod planner;
mod response;
mod utils;

// Re-export the main entry points and the plan vocabulary.
pub use assemble::{plan_client, plan_from_json};
pub use plan::{
    AuthPlan, BodyStep, ClientPlan, ClosePlan, CloseStep, DispatcherConfig, FieldDecl, InitPlan,
    InitStep, MemberDecl, MessageTypeDecl, OperationPlan, ParamDecl, PipeBinding, PipeKey,
    RPC_PIPE_CAPACITY, ReadLoopPlan, ResponseMode, ReturnType, RouteRule, STREAM_PIPE_CAPACITY,
    StreamAdapterDecl, WRITE_QUEUE_CAPACITY, WriteLoopPlan,
};
pub use response::return_type_expression;
