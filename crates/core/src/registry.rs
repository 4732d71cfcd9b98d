//! Tool registry, per-tool limits, and the per-run usage ledger.
//!
//! The registry is shared configuration: it is built once and read by
//! every run. The [`UsageLedger`] is owned by a single run and passed in
//! mutably, so concurrent runs never share counters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ToolError, ValidationError};
use crate::tool::{Tool, ToolCall, ToolDefinition, ToolResult};
use crate::validation;

pub const DEFAULT_TOOL_LIMIT: u32 = 3;

/// Per-tool call ceilings with a fallback default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLimits {
    /// Explicit ceilings by tool name
    #[serde(default)]
    pub per_tool: BTreeMap<String, u32>,

    /// Ceiling for tools absent from `per_tool`
    #[serde(default = "default_tool_limit")]
    pub default: u32,
}

fn default_tool_limit() -> u32 {
    DEFAULT_TOOL_LIMIT
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            per_tool: BTreeMap::new(),
            default: DEFAULT_TOOL_LIMIT,
        }
    }
}

impl ToolLimits {
    pub fn limit_for(&self, name: &str) -> u32 {
        self.per_tool.get(name).copied().unwrap_or(self.default)
    }
}

/// How many times each tool has been successfully invoked in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageLedger {
    counts: BTreeMap<String, u32>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    fn record(&mut self, name: &str) {
        *self.counts.entry(name.to_string()).or_insert(0) += 1;
    }
}

/// A registry of available tools and their limits.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them, under limits
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    limits: ToolLimits,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be valid and unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ValidationError> {
        let name = tool.name().to_string();
        validation::name_is_valid(&name)?;
        validation::description_is_valid(tool.description())?;
        if !tool.parameters_schema().is_object() {
            return Err(ValidationError::InvalidSchema(name));
        }
        if self.tools.contains_key(&name) {
            return Err(ValidationError::DuplicateTool(name));
        }

        debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Set the ceiling for one tool. The tool does not need to be registered yet.
    pub fn set_limit(&mut self, name: impl Into<String>, limit: u32) -> Result<(), ValidationError> {
        validation::is_positive("tool limit", limit)?;
        self.limits.per_tool.insert(name.into(), limit);
        Ok(())
    }

    /// Set the ceiling for tools without an explicit limit.
    pub fn set_default_limit(&mut self, limit: u32) -> Result<(), ValidationError> {
        validation::is_positive("default tool limit", limit)?;
        self.limits.default = limit;
        Ok(())
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn limit_for(&self, name: &str) -> u32 {
        self.limits.limit_for(name)
    }

    pub fn limits(&self) -> &ToolLimits {
        &self.limits
    }

    /// The ceiling in force for every registered tool.
    pub fn effective_limits(&self) -> BTreeMap<String, u32> {
        self.tools
            .keys()
            .map(|name| (name.clone(), self.limit_for(name)))
            .collect()
    }

    /// Get all tool definitions (for sending to the LLM), sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute one tool call under its limit.
    ///
    /// The ledger is incremented only after the tool returns successfully.
    pub async fn invoke(
        &self,
        call: &ToolCall,
        ledger: &mut UsageLedger,
    ) -> Result<ToolResult, ToolError> {
        let tool = self.lookup(&call.tool_name)?;

        let limit = self.limit_for(&call.tool_name);
        let used = ledger.count(&call.tool_name);
        if used >= limit {
            warn!(tool = %call.tool_name, used, limit, "Tool limit reached");
            return Err(ToolError::LimitReached {
                tool_name: call.tool_name.clone(),
                limit,
            });
        }

        debug!(tool = %call.tool_name, call_id = %call.id, "Invoking tool");
        let result = tool.invoke(&call.id, &call.arguments).await?;
        ledger.record(&call.tool_name);
        Ok(result)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("limits", &self.limits)
            .finish()
    }
}
