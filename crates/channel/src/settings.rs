use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

/// `config.toml` next to the running executable, if that can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    crate::exe_directory().map(|d| d.join("config.toml"))
}

/// Load settings from `path`. A missing or malformed file yields defaults.
///
/// Both binaries read the same file; each deserializes only its own sections
/// and ignores the rest.
pub fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> T {
    let Some(path) = path else {
        tracing::warn!("Could not determine config location, using defaults");
        return T::default();
    };

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {e}", path.display());
                T::default()
            }
        },
        Err(_) => {
            tracing::info!("{} not found, using defaults", path.display());
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Default, Debug, PartialEq)]
    struct Section {
        #[serde(default)]
        name: String,
    }

    #[derive(Deserialize, Default, Debug, PartialEq)]
    struct Settings {
        #[serde(default)]
        mine: Section,
    }

    #[test]
    fn reads_own_section_and_ignores_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[other]\nx = 1\n\n[mine]\nname = \"aria\"\n").unwrap();

        let settings: Settings = load_config(Some(&path));
        assert_eq!(settings.mine.name, "aria");
    }

    #[test]
    fn missing_or_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(load_config::<Settings>(Some(&path)), Settings::default());
        assert_eq!(load_config::<Settings>(None), Settings::default());

        std::fs::write(&path, "[mine\nname = ").unwrap();
        assert_eq!(load_config::<Settings>(Some(&path)), Settings::default());
    }
}
