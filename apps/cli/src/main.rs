//! Kiosko CLI - load, preload and inspect Kiosko modules.
//!
//! Modules are read from an HTTP origin (`--base-url` or `base_url` in the
//! configuration) or from a local directory (`--root`).

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{ConfigCommand, Session};

/// Kiosko - module loading and preloading
#[derive(Parser, Debug)]
#[command(name = "kiosko", author, version, about = "Kiosko - module loading and preloading")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file (skips discovery of kiosko.toml and ~/.kiosko/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// HTTP origin serving module assets (overrides KIOSKO_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory assets are read from when no HTTP origin is configured
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Module directory relative to the asset root (default: ./modules)
    #[arg(long, global = true)]
    modules_dir: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load modules in order, as if navigating to each
    Load {
        /// Modules to load
        #[arg(required = true)]
        modules: Vec<String>,

        /// Per-module timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Wait this long after the last load so predicted modules get warmed
        #[arg(long, default_value = "0")]
        settle_ms: u64,
    },

    /// Warm modules into the cache without loading them
    Preload {
        /// Modules to warm
        #[arg(required = true)]
        modules: Vec<String>,

        /// Wait this long for queued warm-ups and retries
        #[arg(long, default_value = "200")]
        settle_ms: u64,
    },

    /// Predict the next modules after a navigation history
    Predict {
        /// Modules visited, oldest first
        #[arg(long, num_args = 1..)]
        after: Vec<String>,
    },

    /// Inspect or create configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn parse_level(level: &str) -> Level {
    match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = commands::load_config(args.config.as_deref(), args.base_url.clone(), args.modules_dir.clone())?;

    let level = args.log_level.as_deref().or(config.log_level.as_deref()).map_or(Level::WARN, parse_level);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let session = Session { config, root: args.root, json: args.json };
    match args.command {
        Command::Load { modules, timeout_ms, settle_ms } => {
            commands::load::execute(&session, &modules, timeout_ms, settle_ms).await
        }
        Command::Preload { modules, settle_ms } => commands::preload::execute(&session, &modules, settle_ms).await,
        Command::Predict { after } => commands::predict::execute(&session, &after).await,
        Command::Config(cmd) => commands::config::execute(&session, cmd),
    }
}
