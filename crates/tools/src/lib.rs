//! Built-in tool implementations for AgentLoop.
//!
//! Each tool is a [`FunctionTool`](agentloop_core::tool::FunctionTool) with
//! typed parameters and a typed result; the parameter schema shown to the
//! model is derived from the parameter struct.

pub mod add;
pub mod http_get;

pub use add::add_tool;
pub use http_get::{DEFAULT_MAX_BODY_BYTES, http_get_tool};
