//! The agent execution loop.
//!
//! An [`Agent`] drives a conversation between the caller, an LLM gateway
//! and a set of tools until the model produces a structured answer:
//!
//! 1. **Render** the system prompt (tools, usage so far, limits, behavior)
//! 2. **Call** the model with the conversation
//! 3. **If tool calls**: dispatch them in order under their limits
//! 4. **Intercept** the turn with the middleware chain, then record it
//! 5. **If final**: ask for the structured answer and decode it;
//!    otherwise re-render the system prompt and go back to step 2
//!
//! Hitting a tool limit ends the run with
//! [`ErrorKind::LimitReached`](agentloop_core::ErrorKind::LimitReached) and
//! the history up to that point.

pub mod agent;
pub mod context;
pub mod extractor;
pub mod middleware;
pub mod prompt;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::{Agent, AgentBuilder, AgentResult, DEFAULT_MAX_TURNS, RunError};
pub use context::RunContext;
pub use middleware::{
    BlocklistMiddleware, LoggingMiddleware, Middleware, MiddlewareChain, middleware_fn,
};
pub use prompt::{OUTPUT_PROMPT_TEMPLATE, PromptContext, PromptTemplate, SYSTEM_PROMPT_TEMPLATE};
pub use state::ConversationState;
