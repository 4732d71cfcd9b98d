//! Increment agent: starts from a number and adds 2 per step using the
//! `add` tool, reporting every step.

use std::sync::Arc;

use agentloop_agent::{Agent, LoggingMiddleware};
use agentloop_config::AgentSettings;
use agentloop_core::error::Error;
use agentloop_core::gateway::LlmGateway;
use agentloop_tools::add_tool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "increment_agent";

pub const BEHAVIOR: &str = "You are an increment agent. You must:
1. Start with the provided start_number
2. Call the add tool once per step, adding 2 each time, until you have done `steps` steps
3. Record each step and return the final number";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IncrementInput {
    /// Starting number for increment
    pub start_number: i64,
    /// Number of steps to increment
    pub steps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct IncrementResult {
    /// Final result after all increments
    pub final_number: i64,
    /// List of steps taken to reach the final number
    pub steps: Vec<String>,
}

/// Build the agent. `add` may be called at most `steps` times.
pub fn agent(
    gateway: Arc<dyn LlmGateway>,
    settings: &AgentSettings,
    steps: u32,
) -> Result<Agent<IncrementResult>, Error> {
    let builder = Agent::<IncrementResult>::builder()
        .name(NAME)
        .behavior(BEHAVIOR)
        .gateway(gateway)
        .tool(add_tool()?)
        .middleware(LoggingMiddleware);
    super::apply_settings(builder, settings)
        .tool_limit("add", steps)
        .build()
}
