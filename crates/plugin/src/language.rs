use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{error, info};

/// Which language Aria answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageMode {
    Turkish,
    English,
    #[default]
    Auto,
}

impl LanguageMode {
    /// Instruction placed at the top of the system prompt.
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Turkish => "Always respond in Turkish, regardless of input language. Be warm and friendly in Turkish.",
            Self::English => "Always respond in English, regardless of input language. Be friendly and casual in English.",
            Self::Auto => "Always respond in the same language that the user is using. Match their language naturally.",
        }
    }

    fn token(self) -> &'static str {
        match self {
            Self::Turkish => "turkish",
            Self::English => "english",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for LanguageMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "turkish" => Ok(Self::Turkish),
            "english" => Ok(Self::English),
            "auto" => Ok(Self::Auto),
            _ => Err(()),
        }
    }
}

/// Current mode from the config file. Anything unreadable means `Auto`.
pub fn read_mode(path: &Path) -> LanguageMode {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents.parse().unwrap_or_default(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => LanguageMode::Auto,
        Err(e) => {
            error!("Error reading language config: {e}");
            LanguageMode::Auto
        }
    }
}

/// Persist `mode` as its lowercase token.
pub fn write_mode(path: &Path, mode: LanguageMode) -> std::io::Result<()> {
    std::fs::write(path, mode.token())?;
    info!("Language setting changed to: {mode}");
    Ok(())
}
