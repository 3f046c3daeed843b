//! AsyncAPI (WebSocket-flavored) client generator.
//!
//! This crate turns a parsed AsyncAPI document describing a single multiplexed
//! WebSocket channel into an abstract generation plan for a typed client:
//! - Message-type declarations from component schemas
//! - A client with init, background read/write loops, remote operations, close
//! - Dispatch wiring: discriminator-key routing, correlation ids, pipes
//!
//! The pipeline is:
//! 1. Parse: AsyncAPI JSON -> [`spec::AsyncApiDoc`]
//! 2. Classify: channel operations -> request/response seeds ([`ir`])
//! 3. Plan: seeds -> [`ir::ClientPlan`] (ordered member list, no concrete syntax)
//!
//! The [`runtime`] module is the support library the generated clients link
//! against: bounded timeout-aware pipes, the correlation-id pipe registry, and
//! the background read/write loops that redistribute inbound frames.

#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

mod error;
pub mod ir;
pub mod runtime;
pub mod spec;

pub use error::{ClientError, GenerateError};
pub use ir::{ClientPlan, plan_client, plan_from_json};
