//! The agent execution loop.

use std::marker::PhantomData;
use std::sync::Arc;

use agentloop_core::error::{Error, ErrorKind, ToolError, ValidationError};
use agentloop_core::gateway::LlmGateway;
use agentloop_core::message::Message;
use agentloop_core::registry::{ToolRegistry, UsageLedger};
use agentloop_core::schema::schema_for;
use agentloop_core::tool::{Tool, ToolCall, ToolDefinition, ToolResult};
use agentloop_core::validation;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::RunContext;
use crate::extractor;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::prompt::{PromptContext, PromptTemplate};
use crate::state::ConversationState;

/// Turn budget when none is configured.
pub const DEFAULT_MAX_TURNS: u32 = 25;

/// A successful run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult<T> {
    /// The decoded final answer
    pub data: T,

    /// Full conversation history, system message first
    pub messages: Vec<Message>,

    /// How many times each tool ran
    pub usage: UsageLedger,
}

/// A run that ended without a result.
///
/// `messages` holds the history as it stood when the run stopped; it is
/// empty when the run failed before the conversation was created.
#[derive(Debug)]
pub struct RunError {
    pub error: Error,
    pub messages: Vec<Message>,
    pub usage: UsageLedger,
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// The model exhausted a tool budget. History is always present.
    pub fn is_limit_reached(&self) -> bool {
        self.error.is_limit_reached()
    }

    pub fn into_error(self) -> Error {
        self.error
    }

    fn before_start(error: Error) -> Self {
        Self {
            error,
            messages: Vec::new(),
            usage: UsageLedger::new(),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// An agent producing results of type `T`.
///
/// The agent itself is immutable configuration. Every call to
/// [`run`](Agent::run) owns its conversation and usage ledger, so one agent
/// can serve any number of concurrent runs.
pub struct Agent<T> {
    name: String,
    behavior: String,
    gateway: Arc<dyn LlmGateway>,
    registry: ToolRegistry,
    definitions: Vec<ToolDefinition>,
    middleware: MiddlewareChain,
    system_prompt: PromptTemplate,
    output_prompt: PromptTemplate,
    output_schema: serde_json::Value,
    max_turns: u32,
    _output: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Agent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("gateway", &self.gateway.name())
            .field("registry", &self.registry)
            .field("middleware", &self.middleware)
            .field("max_turns", &self.max_turns)
            .finish_non_exhaustive()
    }
}

impl<T> Agent<T>
where
    T: DeserializeOwned + JsonSchema,
{
    pub fn builder() -> AgentBuilder<T> {
        AgentBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn output_schema(&self) -> &serde_json::Value {
        &self.output_schema
    }

    /// Render the system prompt as it would look with `usage`.
    pub fn render_system_prompt(&self, usage: &UsageLedger) -> Result<String, Error> {
        let mut context = PromptContext::new();
        context
            .insert_json("tools", &self.definitions)?
            .insert_json("tools_usage", usage)?
            .insert_json("calling_limits", &self.registry.effective_limits())?
            .insert_json("output_schema", &self.output_schema)?;
        context
            .insert("behavior", self.behavior.as_str())
            .insert("agent_name", self.name.as_str());

        let prompt = self.system_prompt.render(&context)?;
        if prompt.trim().is_empty() {
            return Err(Error::EmptySystemPrompt);
        }
        Ok(prompt)
    }

    /// Run the agent on `input`, which is sent to the model as JSON.
    pub async fn run<I>(&self, ctx: &RunContext, input: &I) -> Result<AgentResult<T>, RunError>
    where
        I: Serialize + ?Sized,
    {
        let run_id = Uuid::new_v4();
        if let Some(error) = ctx.check() {
            warn!(agent = %self.name, %run_id, "Run cancelled before start");
            return Err(RunError::before_start(error));
        }

        let mut usage = UsageLedger::new();
        let system_prompt = self
            .render_system_prompt(&usage)
            .map_err(RunError::before_start)?;
        let user_input = serde_json::to_string(input)
            .map_err(|e| RunError::before_start(Error::Serialization(e)))?;
        let mut state = ConversationState::new(system_prompt, user_input);

        info!(
            agent = %self.name,
            %run_id,
            gateway = self.gateway.name(),
            tools = self.registry.len(),
            "Agent run started"
        );

        match self.drive(ctx, &mut state, &mut usage).await {
            Ok(data) => {
                info!(
                    agent = %self.name,
                    %run_id,
                    messages = state.len(),
                    tool_calls = usage.total(),
                    "Agent run finished"
                );
                Ok(AgentResult {
                    data,
                    messages: state.into_messages(),
                    usage,
                })
            }
            Err(error) => {
                warn!(
                    agent = %self.name,
                    %run_id,
                    kind = ?error.kind(),
                    error = %error,
                    messages = state.len(),
                    "Agent run stopped"
                );
                Err(RunError {
                    error,
                    messages: state.into_messages(),
                    usage,
                })
            }
        }
    }

    async fn drive(
        &self,
        ctx: &RunContext,
        state: &mut ConversationState,
        usage: &mut UsageLedger,
    ) -> Result<T, Error> {
        let mut turns = 0u32;

        loop {
            if turns >= self.max_turns {
                return Err(Error::MaxTurnsExceeded { turns });
            }
            turns += 1;

            // ── Call LLM ──
            debug!(turn = turns, messages = state.len(), "Calling LLM");
            let mut reply = ctx
                .guard(self.gateway.call(state.messages(), &self.definitions))
                .await??;

            // ── Dispatch tools ──
            if reply.has_tool_calls() {
                debug!(turn = turns, calls = reply.tool_calls.len(), "Dispatching tools");
                match self.dispatch(ctx, &reply.tool_calls, usage).await? {
                    Dispatch::Completed(results) => reply.tool_results = results,
                    Dispatch::Interrupted { results, error } => {
                        warn!(turn = turns, error = %error, "Stopping run mid-turn");
                        reply.tool_results = results;
                        state.push(reply);
                        return Err(error);
                    }
                }
            }

            // ── Record turn ──
            let reply = self.middleware.apply(state, reply)?;
            let finished = reply.is_final && !reply.has_tool_calls();
            state.push(reply);

            if finished {
                debug!(turn = turns, "Model finished, extracting result");
                break;
            }

            let prompt = self.render_system_prompt(usage)?;
            state.set_system_prompt(prompt);
        }

        extractor::extract(
            self.gateway.as_ref(),
            ctx,
            state,
            &self.output_prompt,
            &self.output_schema,
        )
        .await
    }

    /// Execute the calls of one turn strictly in order, each under `ctx`.
    ///
    /// A limit or a cancellation stops the turn with the results gathered
    /// so far, so the recorded turn agrees with the ledger. Any other tool
    /// error aborts the turn.
    async fn dispatch(
        &self,
        ctx: &RunContext,
        calls: &[ToolCall],
        usage: &mut UsageLedger,
    ) -> Result<Dispatch, Error> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            match ctx.guard(self.registry.invoke(call, usage)).await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(error @ ToolError::LimitReached { .. })) => {
                    return Ok(Dispatch::Interrupted {
                        results,
                        error: error.into(),
                    });
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(error) => return Ok(Dispatch::Interrupted { results, error }),
            }
        }
        Ok(Dispatch::Completed(results))
    }
}

/// Outcome of dispatching the tool calls of one assistant turn.
enum Dispatch {
    /// Every call succeeded; results are in call order.
    Completed(Vec<ToolResult>),
    /// A limit or cancellation stopped the turn; `results` holds what ran
    /// before it.
    Interrupted {
        results: Vec<ToolResult>,
        error: Error,
    },
}

/// Builder for [`Agent`]. Nothing is validated until [`build`](Self::build).
pub struct AgentBuilder<T> {
    name: Option<String>,
    behavior: String,
    gateway: Option<Arc<dyn LlmGateway>>,
    tools: Vec<Arc<dyn Tool>>,
    limits: Vec<(String, u32)>,
    default_tool_limit: Option<u32>,
    middleware: MiddlewareChain,
    system_prompt: PromptTemplate,
    output_prompt: PromptTemplate,
    max_turns: u32,
    _output: PhantomData<fn() -> T>,
}

impl<T> Default for AgentBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AgentBuilder<T> {
    pub fn new() -> Self {
        Self {
            name: None,
            behavior: String::new(),
            gateway: None,
            tools: Vec::new(),
            limits: Vec::new(),
            default_tool_limit: None,
            middleware: MiddlewareChain::new(),
            system_prompt: PromptTemplate::system(),
            output_prompt: PromptTemplate::output(),
            max_turns: DEFAULT_MAX_TURNS,
            _output: PhantomData,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Free-text description of what the agent should do. Surrounding
    /// whitespace is trimmed.
    pub fn behavior(mut self, behavior: impl Into<String>) -> Self {
        self.behavior = behavior.into().trim().to_string();
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn LlmGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn tool_limit(mut self, name: impl Into<String>, limit: u32) -> Self {
        self.limits.push((name.into(), limit));
        self
    }

    pub fn default_tool_limit(mut self, limit: u32) -> Self {
        self.default_tool_limit = Some(limit);
        self
    }

    /// Append a middleware. Middleware run in the order they are added.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Replace the system prompt template. Besides the variables of
    /// [`SYSTEM_PROMPT_TEMPLATE`](crate::prompt::SYSTEM_PROMPT_TEMPLATE), a
    /// custom template may use `agent_name`.
    pub fn system_prompt(mut self, template: PromptTemplate) -> Self {
        self.system_prompt = template;
        self
    }

    pub fn output_prompt(mut self, template: PromptTemplate) -> Self {
        self.output_prompt = template;
        self
    }

    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

impl<T> AgentBuilder<T>
where
    T: DeserializeOwned + JsonSchema,
{
    /// Validate every option and build the agent.
    pub fn build(self) -> Result<Agent<T>, Error> {
        let name = self.name.ok_or(ValidationError::Missing("agent name"))?;
        validation::name_is_valid(&name)?;
        validation::string_is_not_empty("behavior", &self.behavior)?;
        let gateway = self.gateway.ok_or(ValidationError::Missing("LLM gateway"))?;
        validation::is_positive("max turns", self.max_turns)?;

        let mut registry = ToolRegistry::new();
        if let Some(limit) = self.default_tool_limit {
            registry.set_default_limit(limit)?;
        }
        for (tool, limit) in self.limits {
            registry.set_limit(tool, limit)?;
        }
        for tool in self.tools {
            registry.register(tool)?;
        }

        let output_schema = schema_for::<T>()?;
        let definitions = registry.definitions();

        debug!(agent = %name, tools = ?registry.names(), "Built agent");
        Ok(Agent {
            name,
            behavior: self.behavior,
            gateway,
            registry,
            definitions,
            middleware: self.middleware,
            system_prompt: self.system_prompt,
            output_prompt: self.output_prompt,
            output_schema,
            max_turns: self.max_turns,
            _output: PhantomData,
        })
    }
}
