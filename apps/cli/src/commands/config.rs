//! `kiosko config`: inspect and create configuration files.

use anyhow::{Result, bail};
use clap::Subcommand;
use colored::Colorize;
use kiosko_core::KioskoConfig;
use serde::Serialize;
use std::path::PathBuf;

use super::Session;
use crate::output;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// List the configuration files that are consulted
    Path,

    /// Write a default kiosko.toml
    Init {
        /// Where to write (default: ./kiosko.toml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
struct ConfigFile {
    scope: &'static str,
    path: String,
    exists: bool,
}

pub fn execute(session: &Session, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(session),
        ConfigCommand::Path => paths(session),
        ConfigCommand::Init { path, force } => init(path, force),
    }
}

fn show(session: &Session) -> Result<()> {
    session.config.validate()?;
    if session.json {
        output::print_json(&session.config)
    } else {
        print!("{}", session.config.to_toml_string()?);
        Ok(())
    }
}

fn paths(session: &Session) -> Result<()> {
    let files: Vec<ConfigFile> = [("global", KioskoConfig::default_global_path()), ("local", KioskoConfig::default_local_path())]
        .into_iter()
        .map(|(scope, path)| ConfigFile { scope, exists: path.exists(), path: path.display().to_string() })
        .collect();

    if session.json {
        return output::print_json(&files);
    }
    output::section("Configuration files");
    for file in &files {
        let marker = if file.exists { "present".green() } else { "absent".dimmed() };
        println!("  {:<8} {} ({})", file.scope, file.path, marker);
    }
    Ok(())
}

fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(KioskoConfig::default_local_path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    KioskoConfig::default().save_to_file(&path)?;
    output::success(&path.display().to_string(), "written");
    Ok(())
}
