//! Site analyzer agent: explores a website with `http_get` and reports its
//! title, purpose and key insights.

use std::sync::Arc;

use agentloop_agent::Agent;
use agentloop_config::AgentSettings;
use agentloop_core::error::Error;
use agentloop_core::gateway::LlmGateway;
use agentloop_tools::{DEFAULT_MAX_BODY_BYTES, http_get_tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "analyzer_agent";

/// Page fetches allowed per run unless configured or overridden.
pub const DEFAULT_FETCH_LIMIT: u32 = 10;

pub const BEHAVIOR: &str = "You analyze websites and extract what they are about.

PROCEDURE:
1. Fetch the page at the given url with the http_get tool
2. Read its title, meta tags, headings and visible text
3. Follow promising links on the same site (about, contact, services, products, portfolio)
4. Work out who runs the site, who it is for and what it offers
5. Note technical details such as frameworks or hosting hints

Keep fetching pages until you have a complete picture or you run out of fetches.

OUTPUT:
- title: a descriptive title based on the actual content
- purpose: the site's primary purpose in one or two sentences
- key_insights: five to ten concrete observations about the site";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeInput {
    /// URL of the site to analyze
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AnalyzeResult {
    /// Title of the site
    pub title: String,
    /// Purpose of the site
    pub purpose: String,
    /// Key insights about the site
    pub key_insights: Vec<String>,
}

pub fn agent(
    gateway: Arc<dyn LlmGateway>,
    settings: &AgentSettings,
    client: reqwest::Client,
    fetch_limit: Option<u32>,
) -> Result<Agent<AnalyzeResult>, Error> {
    let builder = Agent::<AnalyzeResult>::builder()
        .name(NAME)
        .behavior(BEHAVIOR)
        .gateway(gateway)
        .tool(http_get_tool(client, DEFAULT_MAX_BODY_BYTES)?)
        .tool_limit("http_get", DEFAULT_FETCH_LIMIT);
    let mut builder = super::apply_settings(builder, settings);
    if let Some(limit) = fetch_limit {
        builder = builder.tool_limit("http_get", limit);
    }
    builder.build()
}
