pub mod analyze;
pub mod config_cmd;
pub mod increment;

use std::time::Duration;

use agentloop_agent::{RunContext, RunError};
use agentloop_config::AppConfig;
use anyhow::Context;
use tracing::warn;

/// Load config and make sure a gateway can be built from it.
fn load_config() -> anyhow::Result<AppConfig> {
    let config = AppConfig::load().context("Failed to load config")?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    AGENTLOOP_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    Ok(config)
}

/// A run context that expires after `timeout_secs` and is cancelled on Ctrl-C.
fn run_context(timeout_secs: u64) -> RunContext {
    let ctx = RunContext::new().with_timeout(Duration::from_secs(timeout_secs));
    let token = ctx.token().clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    warn!("Interrupted, cancelling run");
                    token.cancel();
                }
            }
        }
    });
    ctx
}

/// Print what is known about a failed run before surfacing the error.
fn report_failure(err: &RunError) {
    if err.is_limit_reached() {
        println!("⚠️  Tool limit reached: {}", err.error);
    } else {
        println!("❌ Run failed ({:?}): {}", err.kind(), err.error);
    }
    if !err.messages.is_empty() {
        println!("   Conversation had {} messages", err.messages.len());
    }
    for (tool, count) in err.usage.counts() {
        println!("   {tool}: {count} call(s)");
    }
}
