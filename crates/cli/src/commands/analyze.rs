//! `agentloop analyze`: summarize a website.

use std::time::Duration;

use agentloop_cli::demos::analyze::{self, AnalyzeInput};
use anyhow::Context;
use tracing::info;

pub async fn run(url: String, max_fetches: Option<u32>, timeout_secs: u64) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let gateway = agentloop_providers::create_gateway(&config.llm)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.llm.timeout_secs))
        .user_agent(concat!("agentloop/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let agent = analyze::agent(gateway, &config.agent, client, max_fetches)?;

    info!(agent = agent.name(), url = %url, "Starting analysis");
    let ctx = super::run_context(timeout_secs);
    let result = match agent.run(&ctx, &AnalyzeInput { url }).await {
        Ok(result) => result,
        Err(err) => {
            super::report_failure(&err);
            return Err(err.into_error().into());
        }
    };
    ctx.cancel();

    println!("📄 {}", result.data.title);
    println!();
    println!("{}", result.data.purpose);
    println!();
    for insight in &result.data.key_insights {
        println!("  • {insight}");
    }
    println!();
    println!("   Pages fetched: {}", result.usage.count("http_get"));
    Ok(())
}
