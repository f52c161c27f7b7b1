mod bridge;
mod config;
mod credentials;
mod gemini;
mod language;
mod persona;
mod probe;
mod protocol;
mod session;
mod supervisor;

use std::path::PathBuf;

use anyhow::{Context, Result};
use channel::Paths;
use clap::Parser;
use tracing::info;

use crate::probe::ProcessTableProbe;
use crate::session::Session;
use crate::supervisor::{OverlaySupervisor, OVERLAY_BINARY};

#[derive(Parser)]
#[command(name = "aria_companion", about = "Aria companion -- assistant plugin")]
struct Cli {
    /// Path to config.toml (defaults to config.toml next to this exe)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep every shared file (key, log, chat context, lock) in this directory
    #[arg(long)]
    profile_dir: Option<PathBuf>,
}

/// Send tracing output to the plugin log. The overlay tails this file, so
/// lines are written unbuffered and without ANSI colors.
fn init_tracing(paths: &Paths) -> Result<()> {
    let dir = paths
        .log_file
        .parent()
        .context("log file has no parent directory")?;
    let file_name = paths
        .log_file
        .file_name()
        .context("log file has no name")?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".into(),
        ))
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("tracing subscriber already installed")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.profile_dir {
        Some(dir) => Paths::rooted(dir),
        None => Paths::resolve(),
    };
    init_tracing(&paths)?;

    let config_path = cli.config.or_else(channel::default_config_path);
    let config: config::Config = channel::load_config(config_path.as_deref());

    let binary = config
        .overlay_launch
        .binary
        .clone()
        .unwrap_or_else(OverlaySupervisor::default_binary);
    let supervisor = OverlaySupervisor::new(
        binary,
        cli.profile_dir.clone(),
        Box::new(ProcessTableProbe::new(OVERLAY_BINARY)),
    );
    info!("Overlay executable: {}", supervisor.binary().display());

    let mut session = Session::new(paths, config, Box::new(supervisor));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    bridge::run(&mut session, &mut stdin.lock(), &mut stdout.lock());
    Ok(())
}
