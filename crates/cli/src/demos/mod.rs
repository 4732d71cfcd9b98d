//! Ready-made agents.
//!
//! - [`increment`]: repeatedly adds to a number with the `add` tool
//! - [`analyze`]: fetches a website with `http_get` and summarizes it

pub mod analyze;
pub mod increment;

use agentloop_agent::AgentBuilder;
use agentloop_config::AgentSettings;

/// Apply configured engine defaults. Per-tool limits from the config
/// override limits set earlier on the builder.
pub fn apply_settings<T>(builder: AgentBuilder<T>, settings: &AgentSettings) -> AgentBuilder<T> {
    let mut builder = builder
        .default_tool_limit(settings.default_tool_limit)
        .max_turns(settings.max_turns);
    for (tool, limit) in &settings.tool_limits {
        builder = builder.tool_limit(tool.clone(), *limit);
    }
    builder
}
