//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.mocha/config.json`) and
//! environment. Missing file means defaults: local backend on port 8000, UI
//! bundle server on loopback port 8080.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Serving-backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// UI bundle server settings.
    #[serde(default)]
    pub ui: UiConfig,

    /// Chat defaults (e.g. preselected model).
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Where the serving backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// REST base URL of the backend (default "http://127.0.0.1:8000").
    #[serde(default = "default_backend_base_url")]
    pub base_url: String,
}

/// Static asset server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    /// Port for the UI bundle server (default 8080).
    #[serde(default = "default_ui_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"; non-loopback binds are refused).
    #[serde(default = "default_ui_bind")]
    pub bind: String,
}

/// Chat defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Model preselected at startup when it exists in the fetched model list.
    pub default_model: Option<String>,
}

fn default_backend_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_ui_port() -> u16 {
    8080
}

fn default_ui_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_base_url(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            port: default_ui_port(),
            bind: default_ui_bind(),
        }
    }
}

/// Resolve the backend base URL: env MOCHA_BACKEND_URL overrides config.
pub fn resolve_backend_base_url(config: &Config) -> String {
    std::env::var("MOCHA_BACKEND_URL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.backend.base_url.trim().to_string())
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("MOCHA_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".mocha").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or MOCHA_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Create the config directory and a default config file if they do not exist.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.ui.port, 8080);
        assert_eq!(config.ui.bind, "127.0.0.1");
        assert_eq!(config.chat.default_model, None);
    }

    #[test]
    fn parses_partial_config() {
        let config: Config = serde_json::from_str(
            r#"{"backend":{"baseUrl":"http://127.0.0.1:9000"},"chat":{"defaultModel":"llama3"}}"#,
        )
        .expect("parse config");
        assert_eq!(config.backend.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.chat.default_model.as_deref(), Some("llama3"));
        // Untouched sections keep their defaults.
        assert_eq!(config.ui.port, 8080);
    }

    #[test]
    fn empty_object_is_all_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parse config");
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.ui.bind, "127.0.0.1");
    }

    #[test]
    fn loopback_binds() {
        assert!(is_loopback_bind("127.0.0.1"));
        assert!(is_loopback_bind(" localhost "));
        assert!(is_loopback_bind("::1"));
        assert!(!is_loopback_bind("0.0.0.0"));
        assert!(!is_loopback_bind("192.168.1.4"));
    }

    #[test]
    fn init_creates_dir_and_default_file() {
        let dir = std::env::temp_dir().join(format!("mocha-config-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config_path = dir.join("config.json");

        let created = init_config_dir(&config_path).expect("init config dir");
        assert_eq!(created, dir);
        assert_eq!(std::fs::read_to_string(&config_path).expect("read"), "{}");

        // Re-running leaves an existing file alone.
        std::fs::write(&config_path, r#"{"ui":{"port":9090}}"#).expect("write");
        init_config_dir(&config_path).expect("init again");
        let (config, path) = load_config(Some(config_path.clone())).expect("load");
        assert_eq!(config.ui.port, 9090);
        assert_eq!(path, config_path);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
