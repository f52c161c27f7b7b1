use std::path::Path;

use anyhow::{Context, Result};

pub const LOG_FILE: &str = "aria_overlay.log";

/// Send tracing output to `aria_overlay.log` in `dir`. The plugin log is
/// only ever read from this process.
pub fn init_tracing(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
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
