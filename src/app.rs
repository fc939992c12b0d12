use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const API_URL_ENV: &str = "CHAT_API_URL";
pub const PUSH_URL_ENV: &str = "CHAT_PUSH_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub push_url: String,
    pub reconnect_delay_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_SERVER_URL.to_string(),
            push_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay_secs: 3,
        }
    }
}

impl AppConfig {
    pub fn path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("chat-gtk.toml"))
    }

    /// Effective settings: the user config file with environment overrides
    /// applied on top.
    pub fn load() -> Self {
        Self::stored().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// What the user config file holds, without environment overrides.
    /// This is what an edit-and-save should start from.
    pub fn stored() -> Self {
        match Self::path() {
            Some(path) => Self::stored_at(&path),
            None => Self::default(),
        }
    }

    /// Missing or broken files yield the defaults.
    pub fn stored_at(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_url = crate::utils::normalize_url(&url);
        }
        if let Some(url) = lookup(PUSH_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.push_url = crate::utils::normalize_url(&url);
        }
        self
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat-gtk.toml");
        fs::write(&path, "api_url = \"http://chat.lan:8080\"\n").unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.api_url, "http://chat.lan:8080");
        assert_eq!(cfg.push_url, DEFAULT_SERVER_URL);
        assert_eq!(cfg.reconnect_delay_secs, 3);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat-gtk.toml");
        let cfg = AppConfig {
            api_url: "https://api.example.com".into(),
            push_url: "https://push.example.com".into(),
            reconnect_delay_secs: 10,
        };
        cfg.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat-gtk.toml");
        fs::write(&path, "api_url = [").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn env_overrides_win() {
        let cfg = AppConfig::default().with_env_overrides(|key| match key {
            API_URL_ENV => Some("api.example.com".into()),
            PUSH_URL_ENV => Some("  ".into()),
            _ => None,
        });
        assert_eq!(cfg.api_url, "https://api.example.com");
        assert_eq!(cfg.push_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn stored_at_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat-gtk.toml");
        assert_eq!(AppConfig::stored_at(&path), AppConfig::default());
        fs::write(&path, "api_url = [").unwrap();
        assert_eq!(AppConfig::stored_at(&path), AppConfig::default());
    }

    #[test]
    fn saving_stored_settings_keeps_env_values_out_of_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat-gtk.toml");
        fs::write(&path, "api_url = \"http://chat.lan:8080\"\n").unwrap();
        let env = |key: &str| match key {
            API_URL_ENV => Some("http://from-env:1".to_string()),
            PUSH_URL_ENV => Some("http://from-env:2".to_string()),
            _ => None,
        };

        let effective = AppConfig::stored_at(&path).with_env_overrides(env);
        assert_eq!(effective.api_url, "http://from-env:1");

        // the settings page edits only the push url
        let edited = AppConfig { push_url: "http://push.lan:9000".into(), ..AppConfig::stored_at(&path) };
        edited.save_to(&path).unwrap();

        let on_disk = AppConfig::load_from(&path).unwrap();
        assert_eq!(on_disk.api_url, "http://chat.lan:8080");
        assert_eq!(on_disk.push_url, "http://push.lan:9000");
    }

    #[test]
    fn reconnect_delay_is_never_zero() {
        let cfg = AppConfig { reconnect_delay_secs: 0, ..AppConfig::default() };
        assert_eq!(cfg.reconnect_delay(), Duration::from_secs(1));
    }
}
