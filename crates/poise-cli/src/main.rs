//! Poise CLI - construction project tracker

mod input;
mod shell;

use anyhow::Context;
use clap::{Parser, Subcommand};
use input::{EditorSource, ReaderSource};
use poise_core::config::Config;
use poise_core::storage::{Database, DatabaseConfig};
use shell::Shell;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "poise")]
#[command(author, version, about = "Construction project tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Database file (overrides POISE_DATABASE_PATH and the config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },
    /// List all configuration values
    List,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(&config);

    match cli.command {
        None => cmd_shell(&config, cli.database, cli.quiet).await,
        Some(Commands::Config { action }) => cmd_config(config, action, cli.quiet),
    }
}

/// Logs go to stderr; stdout belongs to the menu
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "poise={level},poise_core={level}",
            level = config.log.level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn cmd_shell(config: &Config, database: Option<PathBuf>, quiet: bool) -> anyhow::Result<()> {
    let path = database.unwrap_or_else(|| config.database_path());
    let db = Database::new(DatabaseConfig::with_path(path.clone()))
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    db.health_check().await?;
    info!(path = %db.path().display(), "Database opened");

    let max_attempts = config.shell.max_attempts;
    if io::stdin().is_terminal() {
        let mut shell = Shell::new(&db, EditorSource::new()?, io::stdout())
            .with_max_attempts(max_attempts)
            .quiet(quiet);
        shell.run().await?;
    } else {
        let input = ReaderSource::new(io::stdin().lock(), io::stdout());
        let mut shell = Shell::new(&db, input, io::stdout())
            .with_max_attempts(max_attempts)
            .quiet(quiet);
        shell.run().await?;
    }

    db.close().await;
    Ok(())
}

fn cmd_config(config: Config, action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = config;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
