//! # AgentLoop Core
//!
//! Domain types, traits, and error definitions for the AgentLoop engine.
//! This crate has no runtime or transport dependencies. It defines the
//! domain model that the engine, gateways and tools implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the loop is defined as a trait here:
//! - [`LlmGateway`] for model backends
//! - [`Tool`] for callable capabilities
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted gateways and stub tools.

pub mod error;
pub mod gateway;
pub mod message;
pub mod registry;
pub mod schema;
pub mod tool;
pub mod validation;

// Re-export key types at crate root for ergonomics
pub use error::{BoxError, Error, ErrorKind, ProviderError, Result, ToolError, ValidationError};
pub use gateway::{LlmConfig, LlmGateway, LlmProvider};
pub use message::{Message, Role};
pub use registry::{DEFAULT_TOOL_LIMIT, ToolLimits, ToolRegistry, UsageLedger};
pub use tool::{
    FunctionTool, FunctionToolBuilder, Tool, ToolCall, ToolDefinition, ToolOutput, ToolReply,
    ToolResult,
};
