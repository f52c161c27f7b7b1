use std::path::{Path, PathBuf};

const PLUGIN_DIR: &str = r"NVIDIA Corporation\nvtopps\rise\plugins\aria";

pub const API_KEY_FILE: &str = "gemini.key";
pub const LANGUAGE_FILE: &str = "aria_language.config";
pub const LOG_FILE: &str = "aria_plugin.log";
pub const CHAT_CONTEXT_FILE: &str = "aria_chat_context.txt";
pub const LOCK_FILE: &str = "aria_canvas_overlay.lock";

/// Well-known locations of every file the two processes share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Plugin data directory holding the credential and language files.
    pub plugin_dir: PathBuf,
    pub api_key: PathBuf,
    pub language_config: PathBuf,
    pub log_file: PathBuf,
    pub chat_context: PathBuf,
    pub lock_file: PathBuf,
}

impl Paths {
    /// Resolve the default layout for this machine.
    ///
    /// The plugin directory lives under `%PROGRAMDATA%` (falling back to the
    /// directory of the running executable), the log and chat-context files
    /// under the user profile, and the lock file in the OS temp directory.
    pub fn resolve() -> Self {
        let plugin_dir = match std::env::var_os("PROGRAMDATA") {
            Some(data) => PathBuf::from(data).join(PLUGIN_DIR),
            None => exe_directory().unwrap_or_else(|| PathBuf::from(".")),
        };
        let profile = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            api_key: plugin_dir.join(API_KEY_FILE),
            language_config: plugin_dir.join(LANGUAGE_FILE),
            log_file: profile.join(LOG_FILE),
            chat_context: profile.join(CHAT_CONTEXT_FILE),
            lock_file: std::env::temp_dir().join(LOCK_FILE),
            plugin_dir,
        }
    }

    /// Put every shared file in `dir`. Used by `--profile-dir` and tests.
    pub fn rooted(dir: &Path) -> Self {
        Self {
            plugin_dir: dir.to_path_buf(),
            api_key: dir.join(API_KEY_FILE),
            language_config: dir.join(LANGUAGE_FILE),
            log_file: dir.join(LOG_FILE),
            chat_context: dir.join(CHAT_CONTEXT_FILE),
            lock_file: dir.join(LOCK_FILE),
        }
    }
}

/// Directory containing the running executable.
pub fn exe_directory() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(Path::to_path_buf)
}
