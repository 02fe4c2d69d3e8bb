// src/relay/mod.rs

//! Chat relay: turns one inbound message into validation, a scratch write,
//! a worker run, and the replies describing each step.
//!
//! The pure state machine lives in [`flow`]; reply texts in [`replies`];
//! the async driver in [`handler`].

pub mod flow;
pub mod handler;
pub mod replies;

pub use flow::{FlowInput, FlowState, RequestFlow};
pub use handler::{Handled, Relay, RelaySettings};
