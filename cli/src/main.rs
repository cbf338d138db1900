//! Lineage CLI: browse and record versioned JSON datasets.
//!
//! ```text
//! main() -> Settings (flags > config > defaults) -> Session
//!             |
//!             +-- shell (default): read statement -> rebase -> command
//!             +-- log / show / ds / commit / version: one command, then exit
//! ```
//!
//! Logs go to `~/.lineage/logs/lineage.log`, never to stdout, so they cannot
//! interleave with rendered history.

mod args;
mod config;
mod session;
mod shell;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::args::{Cli, Command};
use crate::config::{LineageConfig, Settings};
use crate::session::{LogRequest, Session};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("LINEAGE_LOG")
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than mixing logs into command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.lineage/logs/lineage.log
    if let Some(config_path) = config::config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("lineage.log"));
    }

    // Fallback: ./.lineage/logs/lineage.log
    candidates.push(PathBuf::from(".lineage").join("logs").join("lineage.log"));

    candidates
}

fn load_config() -> LineageConfig {
    match LineageConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(path = %err.path().display(), "{err}");
            eprintln!("warning: {err}; using defaults");
            LineageConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config();
    let settings = Settings::resolve(&config, &cli.global);
    let mut session = Session::open(settings)?;
    let mut stdout = io::stdout();

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => shell::run(&mut session, io::stdin().lock(), &mut stdout).await?,
        Command::Log(args) => {
            session.log(&LogRequest::from(args)).await?;
        }
        Command::Show { spec } => session.show(&spec, &mut stdout).await?,
        Command::Ds { pattern } => session.list_datasets(pattern.as_deref(), &mut stdout)?,
        Command::Commit(args) => {
            let hash = session.commit(&args)?;
            writeln!(stdout, "{hash}")?;
        }
        Command::Version => session.version(&mut stdout)?,
    }

    stdout.flush()?;
    Ok(())
}
