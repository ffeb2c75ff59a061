//! Global configuration.
//!
//! A single TOML file, loaded once at startup and exposed through
//! `Settings::current()`. Everything has a default so the binary runs with
//! no config file at all; `secret_key` must be overridden before handing
//! links to anyone.

use std::sync::{Arc, LazyLock, RwLock};

use serde::{Deserialize, Serialize};

/// Secret used when none is configured. Fine for local experiments only.
pub const DEFAULT_SECRET: &str = "subscription-converter-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_address: String,
    pub listen_port: u16,
    pub max_concur_threads: usize,
    /// Upstream fetch timeout, seconds.
    pub fetch_timeout: u64,
    /// HMAC key for timed links.
    pub secret_key: String,
    /// Default timed-link lifetime, hours.
    pub default_expire_hours: u32,
    /// Directory scanned for custom templates.
    pub template_dir: String,
    /// Name fragments marking provider-injected informational entries.
    pub info_node_keywords: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 8080,
            max_concur_threads: 4,
            fetch_timeout: 30,
            secret_key: DEFAULT_SECRET.to_string(),
            default_expire_hours: 24,
            template_dir: "templates".to_string(),
            info_node_keywords: [
                "流量", "到期", "剩余", "套餐", "过期", "GB", "MB", "TB", "天", "月", "年",
                "expire", "traffic", "remain",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

static SETTINGS: LazyLock<RwLock<Arc<Settings>>> =
    LazyLock::new(|| RwLock::new(Arc::new(Settings::default())));

impl Settings {
    /// The current global settings snapshot.
    pub fn current() -> Arc<Settings> {
        SETTINGS
            .read()
            .map(|guard| Arc::clone(&*guard))
            .unwrap_or_default()
    }

    /// Replaces the global settings.
    pub fn replace(settings: Settings) {
        if let Ok(mut guard) = SETTINGS.write() {
            *guard = Arc::new(settings);
        }
    }

    /// Parses settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Settings, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

/// Loads settings from an optional config file into the global slot.
/// An empty path keeps the defaults.
pub fn init_settings(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Ok(());
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path, e))?;
    let settings = Settings::from_toml(&content)?;
    Settings::replace(settings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.listen_port, 8080);
        assert_eq!(settings.default_expire_hours, 24);
        assert!(settings
            .info_node_keywords
            .iter()
            .any(|k| k == "traffic"));
    }

    #[test]
    fn test_from_toml_partial_override() {
        let settings = Settings::from_toml(
            r#"
listen_port = 9090
secret_key = "super-secret"
info_node_keywords = ["expire"]
"#,
        )
        .unwrap();
        assert_eq!(settings.listen_port, 9090);
        assert_eq!(settings.secret_key, "super-secret");
        assert_eq!(settings.info_node_keywords, vec!["expire".to_string()]);
        // Untouched fields keep their defaults.
        assert_eq!(settings.fetch_timeout, 30);
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(Settings::from_toml("listen_port = \"not a number\"").is_err());
    }
}
