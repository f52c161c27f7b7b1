use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

pub const API_KEY_URL: &str = "https://aistudio.google.com/app/apikey";
const PLACEHOLDER: &str = "YOUR_GEMINI_API_KEY_HERE";

/// Why no usable API key was found. Each message tells the user how to fix it.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("API key file is empty or contains placeholder. Please add your actual API key from: {}", API_KEY_URL)]
    Placeholder,
    #[error("Cannot read gemini.key file: {0}")]
    Unreadable(std::io::Error),
    #[error("Found gemini.key.txt file. Please rename it to 'gemini.key' (remove .txt extension)")]
    WrongExtension,
    #[error("Please create a 'gemini.key' file with your Gemini API key from: {}", API_KEY_URL)]
    ExampleOnly,
    #[error("No API key file found. Please create 'gemini.key' file in: {} and add your API key from: {}", .dir.display(), API_KEY_URL)]
    Missing { dir: PathBuf },
}

/// Look for the key at `key_path`, diagnosing the common setup mistakes.
pub fn find_api_key(key_path: &Path) -> Result<String, CredentialError> {
    if key_path.is_file() {
        let key = std::fs::read_to_string(key_path).map_err(|e| {
            error!("Error reading gemini.key: {e}");
            CredentialError::Unreadable(e)
        })?;
        let key = key.trim();
        if key.is_empty() || key == PLACEHOLDER {
            warn!("gemini.key file exists but is empty or contains placeholder");
            return Err(CredentialError::Placeholder);
        }
        info!("Found valid API key in gemini.key");
        return Ok(key.to_string());
    }

    if with_suffix(key_path, ".txt").is_file() {
        warn!("Found gemini.key.txt instead of gemini.key");
        return Err(CredentialError::WrongExtension);
    }

    if with_suffix(key_path, ".example").is_file() {
        info!("Found gemini.key.example file");
        return Err(CredentialError::ExampleOnly);
    }

    let dir = key_path.parent().map(Path::to_path_buf).unwrap_or_default();
    error!("No API key file found in: {}", dir.display());
    Err(CredentialError::Missing { dir })
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
