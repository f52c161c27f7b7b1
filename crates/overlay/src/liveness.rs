use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Whether the plugin still looks alive, judged by its log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    /// The log has not been written for longer than the threshold.
    Stale(Duration),
    Missing,
}

impl Liveness {
    pub fn should_exit(self) -> bool {
        !matches!(self, Self::Alive)
    }
}

/// Compare the log's modification time against `now`.
///
/// A modification time in the future counts as fresh. Metadata errors other
/// than a missing file are treated as alive so a transient failure does not
/// close the window.
pub fn check(log_file: &Path, now: SystemTime, stale_after: Duration) -> Liveness {
    let modified = match std::fs::metadata(log_file).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Liveness::Missing,
        Err(e) => {
            tracing::warn!("Cannot stat {}: {e}", log_file.display());
            return Liveness::Alive;
        }
    };
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    if age > stale_after {
        Liveness::Stale(age)
    } else {
        Liveness::Alive
    }
}
