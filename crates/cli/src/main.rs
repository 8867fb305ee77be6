//! issuefold CLI, the main entry point.
//!
//! Commands:
//! - `sum`         Summarize a GitHub issue and its comments
//! - `onboard`     Write the default config file
//! - `config`      Validate, show or locate the config
//! - `doctor`      Check config and backend credentials
//! - `completions` Generate shell completions

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use issuefold_config::Backend;

mod commands;
mod render;

#[derive(Parser)]
#[command(
    name = "issuefold",
    about = "Summarize a GitHub issue thread within a token budget",
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
    /// Summarize a GitHub issue and its comments
    Sum(SumArgs),

    /// Write the default configuration file
    Onboard,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check configuration and credentials
    Doctor,

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Parse and validate the config file
    Validate,
    /// Print the effective configuration (secrets masked)
    Show,
    /// Print the config file path
    Path,
}

#[derive(Args, Debug, Clone)]
pub struct SumArgs {
    /// The GitHub organization or user that owns the repo
    #[arg(short, long, default_value = "firebase")]
    pub org: String,

    /// The GitHub repo
    #[arg(short, long, default_value = "flutterfire")]
    pub repo: String,

    /// The issue number
    #[arg(short, long)]
    pub issue: u64,

    /// Summarization backend (overrides config)
    #[arg(short, long, value_parser = parse_backend)]
    pub backend: Option<Backend>,

    /// Token budget for one prompt (overrides config)
    #[arg(long)]
    pub budget: Option<usize>,

    /// Prompt template file (overrides config)
    #[arg(long)]
    pub prompt: Option<PathBuf>,

    /// Write every prompt and response into this directory
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Stop at the first failed summarize call
    #[arg(long)]
    pub abort_on_error: bool,

    /// Print the markdown summary without terminal styling
    #[arg(long)]
    pub raw: bool,
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    s.parse().map_err(|e: issuefold_config::ConfigError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the summary
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sum(args) => commands::sum::run(args).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command(), &mut std::io::stdout())
        }
    }

    Ok(())
}
