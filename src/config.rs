//! Persisted convenience settings.
//!
//! Stored as JSON in the platform config directory:
//!   macOS:   ~/Library/Application Support/answer-lens/config.json
//!   Linux:   ~/.config/answer-lens/config.json
//!   Windows: %APPDATA%/answer-lens/config.json
//!
//! Nothing here is critical, so every I/O or parse failure falls back to
//! defaults with a warning instead of an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no key is saved.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: String,
    pub remember_key: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            remember_key: true,
        }
    }
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("answer-lens")
        .join("config.json")
}

impl AppConfig {
    /// Reads the config at `path`, or defaults if it is missing or corrupt.
    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("[CONFIG] Could not read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("[CONFIG] Ignoring corrupt {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Writes the config to `path`. The key is only kept when
    /// `remember_key` is set. Failures are logged and otherwise ignored.
    pub fn save_to(&self, path: &Path) {
        let stored = if self.remember_key {
            self.clone()
        } else {
            Self {
                api_key: String::new(),
                remember_key: false,
            }
        };

        let result = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| {
                let json = serde_json::to_string_pretty(&stored)?;
                std::fs::write(path, json)
            });

        match result {
            Ok(()) => log::info!("[CONFIG] Saved {}", path.display()),
            Err(e) => log::warn!("[CONFIG] Could not save {}: {}", path.display(), e),
        }
    }

    /// The key stored in the config file, if any.
    pub fn saved_api_key(&self) -> Option<String> {
        let saved = self.api_key.trim();
        (!saved.is_empty()).then(|| saved.to_string())
    }
}

/// The `GEMINI_API_KEY` environment variable, if set and non-blank.
pub fn env_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_under_answer_lens() {
        let path = config_path();
        let s = path.to_string_lossy();
        assert!(s.contains("answer-lens"));
        assert!(s.ends_with("config.json"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, AppConfig::default());
        assert!(config.remember_key);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_key": "abc"}"#).unwrap();
        let config = AppConfig::load_from(&path);
        assert_eq!(config.api_key, "abc");
        assert!(config.remember_key);
    }

    #[test]
    fn remembered_key_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            api_key: "secret".to_string(),
            remember_key: true,
        };
        config.save_to(&path);
        assert_eq!(AppConfig::load_from(&path), config);
    }

    #[test]
    fn unremembered_key_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        AppConfig {
            api_key: "secret".to_string(),
            remember_key: false,
        }
        .save_to(&path);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret"));
        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.api_key, "");
        assert!(!loaded.remember_key);
    }

    #[test]
    fn saved_key_is_trimmed() {
        let config = AppConfig {
            api_key: "  from-file ".to_string(),
            remember_key: true,
        };
        assert_eq!(config.saved_api_key().as_deref(), Some("from-file"));
        assert_eq!(AppConfig::default().saved_api_key(), None);
    }
}
