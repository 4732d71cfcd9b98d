//! AgentLoop CLI, the main entry point.
//!
//! Commands:
//! - `increment` runs the increment demo agent
//! - `analyze`   runs the website analyzer agent
//! - `config`    inspects or initializes configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agentloop",
    about = "AgentLoop: tool-calling LLM agents with typed results",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add 2 to a number, step by step, with the add tool
    Increment {
        /// Number to start from
        #[arg(long, default_value_t = 100)]
        start: i64,

        /// How many increments to perform (also the add tool's limit)
        #[arg(long, default_value_t = 3)]
        steps: u32,

        /// Abort the run after this many seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Analyze a website and summarize it
    Analyze {
        /// URL of the site to analyze
        url: String,

        /// Maximum number of page fetches
        #[arg(long)]
        max_fetches: Option<u32>,

        /// Abort the run after this many seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the configuration for problems
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Increment {
            start,
            steps,
            timeout,
        } => commands::increment::run(start, steps, timeout).await?,
        Commands::Analyze {
            url,
            max_fetches,
            timeout,
        } => commands::analyze::run(url, max_fetches, timeout).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Init { force } => commands::config_cmd::init(force)?,
            ConfigAction::Validate => commands::config_cmd::validate()?,
        },
    }

    Ok(())
}
