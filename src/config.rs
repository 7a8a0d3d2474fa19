use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Directory holding the persisted key-value data
    pub data_dir: PathBuf,

    /// Reminder poll period in seconds
    pub poll_period_secs: u64,

    /// Quiet period for the debounced text-edit write path, in milliseconds
    pub debounce_ms: u64,

    /// Width of the area new notes are randomly placed in
    pub spawn_width: f64,

    /// Height of the area new notes are randomly placed in
    pub spawn_height: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            poll_period_secs: 10,
            debounce_ms: 300,
            spawn_width: 520.0,
            spawn_height: 520.0,
        }
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "traynotes")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".traynotes"))
}

impl Config {
    /// Loads configuration from `path`, falling back to defaults when no
    /// path was given or the file is missing or invalid.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "Invalid config file {}, using defaults: {}",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    "Could not read config file {}, using defaults: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// The rectangle new notes spawn inside.
    pub fn spawn_area(&self) -> (f64, f64) {
        (self.spawn_width, self.spawn_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_period_secs, 10);
        assert_eq!(config.debounce_ms, 300);
        assert!(config.spawn_width > 0.0);
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config = Config::load_or_default(None);
        assert_eq!(config.debounce_ms, Config::default().debounce_ms);
    }

    #[test]
    fn test_load_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let config = Config::load_or_default(Some(&path));
        assert_eq!(config.poll_period_secs, 10);
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.poll_period_secs = 30;
        fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        let loaded = Config::load_or_default(Some(&path));
        assert_eq!(loaded.poll_period_secs, 30);
    }
}
