use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{error, info, warn};

use crate::probe::{self, OverlayProbe};

/// Name of the overlay executable, also its process-table signature.
pub const OVERLAY_BINARY: &str = "aria_overlay";

/// Show/hide requests coming from chat commands. Both are best-effort.
pub trait OverlayControl {
    /// Returns whether an overlay is running (or was started).
    fn show(&mut self) -> bool;
    fn hide(&mut self) -> bool;
}

/// Launches the overlay executable at most once at a time.
pub struct OverlaySupervisor {
    binary: PathBuf,
    profile_dir: Option<PathBuf>,
    probe: Box<dyn OverlayProbe>,
}

impl OverlaySupervisor {
    pub fn new(binary: PathBuf, profile_dir: Option<PathBuf>, probe: Box<dyn OverlayProbe>) -> Self {
        Self { binary, profile_dir, probe }
    }

    /// `aria_overlay` next to the running plugin executable.
    pub fn default_binary() -> PathBuf {
        let name = format!("{OVERLAY_BINARY}{}", std::env::consts::EXE_SUFFIX);
        channel::exe_directory()
            .map(|d| d.join(&name))
            .unwrap_or_else(|| PathBuf::from(name))
    }

    fn launch(&self) -> bool {
        if !self.binary.is_file() {
            error!("Overlay executable not found: {}", self.binary.display());
            return false;
        }

        let mut command = Command::new(&self.binary);
        if let Some(dir) = &self.profile_dir {
            command.arg("--profile-dir").arg(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = self.binary.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        hide_console(&mut command);

        match command.spawn() {
            Ok(child) => {
                info!("Overlay process started (PID: {})", child.id());
                true
            }
            Err(e) => {
                error!("Failed to start overlay process: {e}");
                false
            }
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl OverlayControl for OverlaySupervisor {
    fn show(&mut self) -> bool {
        if self.probe.is_overlay_alive() {
            info!("Overlay already running, not starting new one");
            return true;
        }
        self.launch()
    }

    fn hide(&mut self) -> bool {
        for pid in self.probe.overlay_pids() {
            if probe::terminate(pid) {
                info!("Overlay process {pid} terminated");
            } else {
                warn!("Could not terminate overlay process {pid}");
            }
        }
        true
    }
}

#[cfg(windows)]
fn hide_console(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_command: &mut Command) {}
