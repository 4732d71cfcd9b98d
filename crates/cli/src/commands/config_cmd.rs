//! `agentloop config`: configuration management commands.

use std::path::PathBuf;

use agentloop_config::{AppConfig, CONFIG_PATH_ENV};
use anyhow::Context;

/// The file `AppConfig::load` reads.
fn active_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| AppConfig::config_path())
}

pub fn validate() -> anyhow::Result<()> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No API key set (set AGENTLOOP_API_KEY or OPENAI_API_KEY)");
            }
            if config.agent.max_turns < 2 {
                warnings.push("max_turns below 2 leaves no room for a tool round trip");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:    {:?}", config.llm.provider);
            println!("   Model:       {}", config.llm.model);
            println!("   Base URL:    {}", config.llm.base_url);
            println!("   Max turns:   {}", config.agent.max_turns);
            println!("   Tool limit:  {} (default)", config.agent.default_tool_limit);
            for (tool, limit) in &config.agent.tool_limits {
                println!("                {tool} = {limit}");
            }
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub fn show() -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("Failed to load config")?;
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path() {
    println!("{}", active_path().display());
}

pub fn init(force: bool) -> anyhow::Result<()> {
    let path = active_path();
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✅ Wrote default config to {}", path.display());
    Ok(())
}
