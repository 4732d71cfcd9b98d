//! Middleware chain.
//!
//! Every assistant turn passes through the chain before it is written to
//! the conversation history. Middleware run strictly in registration order;
//! each receives the previous one's output. The first error aborts the run.

use std::sync::Arc;

use agentloop_core::error::{BoxError, Error};
use agentloop_core::message::Message;
use tracing::{debug, info};

use crate::state::ConversationState;

/// An interceptor applied to each assistant turn.
///
/// `state` is the history *before* this turn is appended. Implementations
/// may return the message unchanged, return a rewritten one, or reject the
/// turn with an error.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, state: &ConversationState, message: Message) -> Result<Message, BoxError>;
}

/// Ordered list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|m| m.name()).collect()
    }

    /// Thread `message` through every layer.
    pub fn apply(&self, state: &ConversationState, message: Message) -> Result<Message, Error> {
        let mut message = message;
        for layer in &self.layers {
            debug!(middleware = layer.name(), "Applying middleware");
            message = layer
                .process(state, message)
                .map_err(|source| Error::Middleware {
                    name: layer.name().to_string(),
                    source,
                })?;
        }
        Ok(message)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Middleware backed by a closure.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

/// Wrap a closure as middleware.
///
/// ```
/// use agentloop_agent::middleware::{middleware_fn, Middleware};
///
/// let upper = middleware_fn("upper", |_state, mut msg| {
///     msg.content = msg.content.to_uppercase();
///     Ok(msg)
/// });
/// assert_eq!(upper.name(), "upper");
/// ```
pub fn middleware_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: Fn(&ConversationState, Message) -> Result<Message, BoxError> + Send + Sync,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&ConversationState, Message) -> Result<Message, BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, state: &ConversationState, message: Message) -> Result<Message, BoxError> {
        (self.f)(state, message)
    }
}

/// Logs each turn and passes it through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn process(&self, state: &ConversationState, message: Message) -> Result<Message, BoxError> {
        let tools: Vec<&str> = message
            .tool_calls
            .iter()
            .map(|c| c.tool_name.as_str())
            .collect();
        info!(
            history = state.len(),
            is_final = message.is_final,
            tool_calls = ?tools,
            content = %message.content,
            "Assistant turn"
        );
        Ok(message)
    }
}

/// Rejects any turn whose content contains one of the blocked phrases
/// (case-insensitive).
#[derive(Debug, Clone)]
pub struct BlocklistMiddleware {
    phrases: Vec<String>,
}

impl BlocklistMiddleware {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}

impl Middleware for BlocklistMiddleware {
    fn name(&self) -> &str {
        "blocklist"
    }

    fn process(&self, _state: &ConversationState, message: Message) -> Result<Message, BoxError> {
        let content = message.content.to_lowercase();
        if let Some(phrase) = self.phrases.iter().find(|p| content.contains(p.as_str())) {
            return Err(format!("turn contains blocked phrase '{phrase}'").into());
        }
        Ok(message)
    }
}
