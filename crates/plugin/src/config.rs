use std::path::PathBuf;

use serde::Deserialize;

/// Plugin settings read from `config.toml` next to the executable.
/// Sections belonging to the overlay are ignored here.
#[derive(Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub overlay_launch: LaunchConfig,
}

#[derive(Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Clone, Default)]
pub struct LaunchConfig {
    /// Override the overlay executable. Default: `aria_overlay` next to this exe.
    pub binary: Option<PathBuf>,
}

fn default_model() -> String { "gemini-2.0-flash".into() }
fn default_max_output_tokens() -> u32 { 1024 }
fn default_timeout_secs() -> u64 { 60 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
