use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Overlay settings read from `config.toml` next to the executable.
/// Sections belonging to the plugin are ignored here.
#[derive(Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_emotion_interval_ms")]
    pub emotion_interval_ms: u64,
    #[serde(default = "default_liveness_interval_secs")]
    pub liveness_interval_secs: u64,
    /// Close once the plugin log has not changed for this long.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Quiet period after the last chunk before an answer is shown.
    #[serde(default = "default_completion_ms")]
    pub completion_ms: u64,
    #[serde(default = "default_speech_secs")]
    pub speech_secs: u64,
    #[serde(default = "default_context_secs")]
    pub context_secs: u64,
    /// Use this sprite sheet instead of searching the default locations.
    pub sprite_sheet: Option<PathBuf>,
    /// Distance from the screen edges when placed at startup.
    #[serde(default = "default_margin")]
    pub margin: f32,
}

fn default_emotion_interval_ms() -> u64 { 1000 }
fn default_liveness_interval_secs() -> u64 { 5 }
fn default_stale_after_secs() -> u64 { 120 }
fn default_completion_ms() -> u64 { 300 }
fn default_speech_secs() -> u64 { 15 }
fn default_context_secs() -> u64 { 8 }
fn default_margin() -> f32 { 20.0 }

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            emotion_interval_ms: default_emotion_interval_ms(),
            liveness_interval_secs: default_liveness_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            completion_ms: default_completion_ms(),
            speech_secs: default_speech_secs(),
            context_secs: default_context_secs(),
            sprite_sheet: None,
            margin: default_margin(),
        }
    }
}

impl OverlayConfig {
    pub fn emotion_interval(&self) -> Duration {
        Duration::from_millis(self.emotion_interval_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn completion(&self) -> Duration {
        Duration::from_millis(self.completion_ms)
    }

    pub fn speech(&self) -> Duration {
        Duration::from_secs(self.speech_secs)
    }

    pub fn context(&self) -> Duration {
        Duration::from_secs(self.context_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn plugin_sections_are_ignored() {
        let config: Config = toml::from_str(
            "[api]\nmodel = \"x\"\n\n[overlay]\nstale_after_secs = 30\nsprite_sheet = \"a.png\"\n",
        )
        .unwrap();
        assert_eq!(config.overlay.stale_after(), Duration::from_secs(30));
        assert_eq!(config.overlay.emotion_interval(), Duration::from_secs(1));
        assert_eq!(config.overlay.sprite_sheet.as_deref(), Some(Path::new("a.png")));
        assert_eq!(config.overlay.margin, 20.0);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[overlay\nnope").unwrap();

        let config = channel::load_config::<Config>(Some(&path));
        assert_eq!(config.overlay.completion(), Duration::from_millis(300));
        assert_eq!(config.overlay.speech(), Duration::from_secs(15));
        assert_eq!(config.overlay.context(), Duration::from_secs(8));
    }
}
