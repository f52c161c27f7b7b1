use std::path::PathBuf;

use anyhow::{anyhow, Result};
use channel::Paths;
use clap::Parser;
use overlay::{app, config, logging, InstanceLock, LockError, OverlayApp};
use tracing::info;

#[derive(Parser)]
#[command(name = "aria_overlay", about = "Aria avatar window")]
struct Cli {
    /// Path to config.toml (defaults to config.toml next to this exe)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the shared files, as passed to the plugin
    #[arg(long)]
    profile_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.profile_dir {
        Some(dir) => Paths::rooted(dir),
        None => Paths::resolve(),
    };
    let log_dir = cli.profile_dir.clone().unwrap_or_else(std::env::temp_dir);
    logging::init_tracing(&log_dir)?;

    let _lock = match InstanceLock::acquire(&paths.lock_file) {
        Ok(lock) => lock,
        Err(LockError::AlreadyRunning(path)) => {
            info!("Overlay already running ({}), exiting", path.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let config_path = cli.config.or_else(channel::default_config_path);
    let config = channel::load_config::<config::Config>(config_path.as_deref()).overlay;

    info!("Watching {} and {}", paths.log_file.display(), paths.chat_context.display());
    eframe::run_native(
        app::TITLE,
        app::native_options(),
        Box::new(move |cc| Ok(Box::new(OverlayApp::new(cc, &paths, config)))),
    )
    .map_err(|e| anyhow!("overlay window failed: {e}"))?;

    info!("Overlay closed");
    Ok(())
}
