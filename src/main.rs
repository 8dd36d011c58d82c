use anyhow::{Context, Result};
use apex_deploy::logging::{LogFormat, init_tracing};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod cmd;

#[derive(Parser)]
#[command(name = "apex-deploy")]
#[command(version, about = "Phased deployment orchestrator for the Apex topology")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip the confirmation prompt
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Path to the config file. Defaults to apex.toml in the project directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Check prerequisites and run every deployment phase (default)
    Deploy,
    /// Check prerequisites only
    Check,
    /// Print the summary for a previously written topology descriptor
    Summary {
        /// Descriptor to read. Defaults to the configured topology path
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default apex.toml
    Init,
}

fn load_dotenv(project_dir: &Path) {
    match dotenvy::from_path(project_dir.join(".env")) {
        Ok(()) => tracing::debug!("loaded .env from {}", project_dir.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    load_dotenv(&project_dir);

    let result = match cli.command.clone().unwrap_or(Commands::Deploy) {
        Commands::Deploy => cmd::cmd_deploy(&cli, &project_dir).await,
        Commands::Check => cmd::cmd_check(&cli, &project_dir).await,
        Commands::Summary { file } => cmd::cmd_summary(&cli, &project_dir, file.as_deref()),
        Commands::Config { command } => cmd::cmd_config(&cli, &project_dir, command),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "apex-deploy failed");
    }
    result
}
