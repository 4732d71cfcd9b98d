//! Error types for the AgentLoop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is what a run
//! surfaces to the caller, and [`ErrorKind`] flattens it into the
//! taxonomy callers match on.

use thiserror::Error;

/// Boxed error used to carry causes from user code (tools, middleware).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The top-level error type for all AgentLoop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Gateway errors ---
    #[error("LLM call failed: {0}")]
    LlmCall(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Middleware errors ---
    #[error("Middleware '{name}' rejected the turn: {source}")]
    Middleware {
        name: String,
        #[source]
        source: BoxError,
    },

    // --- Result extraction ---
    #[error("Invalid result schema: {0}")]
    InvalidResultSchema(String),

    // --- Prompt errors ---
    #[error("System prompt cannot be empty")]
    EmptySystemPrompt,

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    // --- Configuration errors ---
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Run control ---
    #[error("Run was cancelled")]
    Cancelled,

    #[error("Run deadline exceeded")]
    DeadlineExceeded,

    #[error("Model did not finish within {turns} turns")]
    MaxTurnsExceeded { turns: u32 },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Flat classification of [`Error`], stable for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LlmCall,
    ToolNotFound,
    InvalidArguments,
    ToolError,
    LimitReached,
    MiddlewareError,
    InvalidResultSchema,
    EmptySystemPrompt,
    Cancelled,
    MaxTurnsExceeded,
    Configuration,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LlmCall(_) => ErrorKind::LlmCall,
            Error::Tool(ToolError::NotFound(_)) => ErrorKind::ToolNotFound,
            Error::Tool(ToolError::LimitReached { .. }) => ErrorKind::LimitReached,
            Error::Tool(ToolError::InvalidArguments { .. }) => ErrorKind::InvalidArguments,
            Error::Tool(ToolError::ExecutionFailed { .. }) => ErrorKind::ToolError,
            Error::Middleware { .. } => ErrorKind::MiddlewareError,
            Error::InvalidResultSchema(_) => ErrorKind::InvalidResultSchema,
            Error::EmptySystemPrompt => ErrorKind::EmptySystemPrompt,
            Error::Cancelled | Error::DeadlineExceeded => ErrorKind::Cancelled,
            Error::MaxTurnsExceeded { .. } => ErrorKind::MaxTurnsExceeded,
            Error::Prompt(_)
            | Error::Validation(_)
            | Error::Config { .. }
            | Error::Serialization(_) => ErrorKind::Configuration,
        }
    }

    /// Whether this is the expected "tool budget exhausted" outcome.
    pub fn is_limit_reached(&self) -> bool {
        self.kind() == ErrorKind::LimitReached
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned no usable response: {0}")]
    EmptyResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool limit reached: {tool_name} (limit {limit})")]
    LimitReached { tool_name: String, limit: u32 },

    #[error("Invalid arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {source}")]
    ExecutionFailed {
        tool_name: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Clone, Error)]
pub enum PromptError {
    #[error("Failed to render template '{template}': {reason}")]
    Render { template: String, reason: String },

    #[error("Failed to serialize prompt value '{key}': {reason}")]
    Value { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} cannot be longer than {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} '{value}' does not match pattern {pattern}")]
    Pattern {
        field: &'static str,
        value: String,
        pattern: &'static str,
    },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Parameter schema for tool '{0}' must be a JSON object")]
    InvalidSchema(String),

    #[error("{0} is required")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::LlmCall(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
        assert_eq!(err.kind(), ErrorKind::LlmCall);
    }

    #[test]
    fn tool_errors_map_to_distinct_kinds() {
        let not_found = Error::Tool(ToolError::NotFound("shell".into()));
        let limit = Error::Tool(ToolError::LimitReached {
            tool_name: "add".into(),
            limit: 1,
        });
        let args = Error::Tool(ToolError::InvalidArguments {
            tool_name: "add".into(),
            reason: "missing field `num1`".into(),
        });
        let failed = Error::Tool(ToolError::ExecutionFailed {
            tool_name: "http_get".into(),
            source: "connection refused".into(),
        });

        assert_eq!(not_found.kind(), ErrorKind::ToolNotFound);
        assert_eq!(limit.kind(), ErrorKind::LimitReached);
        assert!(limit.is_limit_reached());
        assert_eq!(args.kind(), ErrorKind::InvalidArguments);
        assert_eq!(failed.kind(), ErrorKind::ToolError);
        assert!(failed.to_string().contains("http_get"));
        assert!(failed.to_string().contains("connection refused"));
    }

    #[test]
    fn middleware_error_keeps_cause() {
        let err = Error::Middleware {
            name: "acl".into(),
            source: "access denied".into(),
        };
        assert_eq!(err.kind(), ErrorKind::MiddlewareError);
        assert!(err.to_string().contains("acl"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("access denied"));
    }

    #[test]
    fn deadline_counts_as_cancellation() {
        assert_eq!(Error::DeadlineExceeded.kind(), ErrorKind::Cancelled);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
