//! Application configuration.
//!
//! Defaults are persisted to a per-user config file. Environment variables
//! override any stored values so the API key never has to be written to disk.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::explorer::enrichment::DEFAULT_PAGE_SIZE;
use crate::explorer::listener::ERROR_STATUS_DELAY_MS;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_url: DEFAULT_GEMINI_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub error_status_delay_ms: u64,
    pub page_size: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            error_status_delay_ms: ERROR_STATUS_DELAY_MS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn config_dir() -> PathBuf {
    if cfg!(windows) {
        let appdata = std::env::var_os("APPDATA")
            .unwrap_or_else(|| std::env::var_os("USERPROFILE").unwrap_or_default());
        let mut path = PathBuf::from(appdata);
        path.push("dbchat");
        path
    } else {
        let home = std::env::var_os("HOME").unwrap_or_default();
        let mut path = PathBuf::from(home);
        path.push(".dbchat");
        path
    }
}

fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

fn load_from_file(path: &Path) -> Option<AppConfig> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            None
        }
    }
}

impl AppConfig {
    /// Applies `DBCHAT_*` overrides read through `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) =
            non_empty(lookup("DBCHAT_GEMINI_API_KEY")).or_else(|| non_empty(lookup("GEMINI_API_KEY")))
        {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = non_empty(lookup("DBCHAT_GEMINI_MODEL")) {
            self.gemini.model = model;
        }
        if let Some(url) = non_empty(lookup("DBCHAT_GEMINI_API_URL")) {
            self.gemini.api_url = url;
        }
        if let Some(delay) = lookup("DBCHAT_ERROR_STATUS_DELAY_MS").and_then(|v| v.trim().parse().ok()) {
            self.error_status_delay_ms = delay;
        }
        if let Some(size) = lookup("DBCHAT_PAGE_SIZE")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|size| *size > 0)
        {
            self.page_size = size;
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn load() -> Self {
        let mut config = load_from_file(&config_path()).unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    /// Writes the config, leaving the API key out of the file
    pub fn save_to_file(&self) -> Result<(), String> {
        self.save_to(&config_path())
    }

    fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let mut stored = self.clone();
        stored.gemini.api_key = None;
        let payload =
            serde_json::to_string_pretty(&stored).map_err(|e| format!("Save failed: {}", e))?;
        fs::write(path, payload).map_err(|e| format!("Save failed: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{ "page_size": 50 }"#).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.error_status_delay_ms, 3000);
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn env_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("GEMINI_API_KEY", "fallback"),
            ("DBCHAT_GEMINI_MODEL", "gemini-1.5-pro"),
            ("DBCHAT_ERROR_STATUS_DELAY_MS", "500"),
            ("DBCHAT_PAGE_SIZE", "0"),
        ]));

        assert_eq!(config.gemini.api_key.as_deref(), Some("fallback"));
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert_eq!(config.error_status_delay_ms, 500);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);

        config.apply_overrides(lookup(&[
            ("DBCHAT_GEMINI_API_KEY", "primary"),
            ("GEMINI_API_KEY", "fallback"),
        ]));
        assert_eq!(config.gemini.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn saved_file_omits_api_key() {
        let dir = std::env::temp_dir().join(format!("dbchat-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");
        let mut config = AppConfig::default();
        config.gemini.api_key = Some("secret".to_string());
        config.page_size = 20;

        config.save_to(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret"));

        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded.page_size, 20);
        assert!(loaded.gemini.api_key.is_none());

        let _ = fs::remove_dir_all(dir);
    }
}
