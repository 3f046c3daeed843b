//! Runtime support library for generated clients.
//!
//! Generated clients delegate their concurrency machinery here: bounded
//! timeout-aware pipes, the keyed registries the read loop routes through,
//! stream adapters for server-streaming replies, and the dispatching client
//! that owns the socket plus its two background loops.
//!
//! ## Module Structure
//!
//! - `pipe`: bounded queues and the pull-based stream adapter
//! - `registry`: keyed pipe and stream registries
//! - `client`: the dispatching client and its read/write loops

mod client;
mod pipe;
mod registry;

pub use client::{DispatchConfig, WsDispatchClient, connect};
pub use pipe::{Pipe, StreamAdapter};
pub use registry::{PipeRegistry, StreamRegistry};
