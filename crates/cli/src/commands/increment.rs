//! `agentloop increment`: run the increment demo agent.

use agentloop_cli::demos::increment::{self, IncrementInput};
use anyhow::Context;
use tracing::info;

pub async fn run(start: i64, steps: u32, timeout_secs: u64) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let gateway = agentloop_providers::create_gateway(&config.llm)?;
    let agent = increment::agent(gateway, &config.agent, steps)?;

    let input = IncrementInput {
        start_number: start,
        steps,
    };
    info!(agent = agent.name(), start, steps, "Starting run");

    let ctx = super::run_context(timeout_secs);
    let result = match agent.run(&ctx, &input).await {
        Ok(result) => result,
        Err(err) => {
            super::report_failure(&err);
            return Err(err.into_error().into());
        }
    };
    ctx.cancel();

    println!("✅ Final number: {}", result.data.final_number);
    for (i, step) in result.data.steps.iter().enumerate() {
        println!("   {}. {step}", i + 1);
    }
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&result.data).context("Failed to encode result")?
    );
    Ok(())
}
