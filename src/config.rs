use crate::constants::{intervals, records, session};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub backend: BackendConfig,

    pub session: SessionConfig,

    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    pub log_format: LogFormat,

    /// Delete expired rows once when the interactive flow starts.
    pub sweep_on_start: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
            sweep_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`. `/rest/v1` is appended.
    pub url: String,

    /// Anonymous access token, sent as both `apikey` and bearer token.
    pub api_key: String,

    pub table: String,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            table: records::TABLE.to_string(),
            request_timeout_seconds: intervals::REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of a stored record (default: 300 = 5 min)
    pub ttl_seconds: u32,

    /// Seconds a retrieved record stays on screen before it is deleted
    pub countdown_seconds: u32,

    pub max_payload_chars: usize,

    /// Payload length used for the single retry after a failed save
    pub fallback_payload_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: records::TTL_SECONDS as u32,
            countdown_seconds: session::COUNTDOWN_SECONDS,
            max_payload_chars: session::MAX_PAYLOAD_CHARS,
            fallback_payload_chars: session::FALLBACK_PAYLOAD_CHARS,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.ttl_seconds))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// External decoder that prints one QR payload to stdout and exits,
    /// e.g. `zbarcam --raw --oneshot`.
    pub command: Option<String>,
}

impl Config {
    /// Loads the first config file found, then applies `.env` and
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env();
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Reads `.env` (if present) and the process environment.
    pub fn apply_env(&mut self) {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from: {}", path.display());
        }
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// `QRSYNC_*` variables win over the Supabase-style names.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |names: &[&str]| {
            names
                .iter()
                .find_map(|&name| lookup(name).filter(|v| !v.trim().is_empty()))
        };

        if let Some(url) = first(&["QRSYNC_BACKEND_URL", "NEXT_PUBLIC_SUPABASE_URL"]) {
            self.backend.url = url;
        }

        if let Some(key) = first(&["QRSYNC_BACKEND_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]) {
            self.backend.api_key = key;
        }

        if let Some(table) = first(&["QRSYNC_TABLE"]) {
            self.backend.table = table;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("qrsync").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".qrsync").join("config.toml"));
        }

        paths
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Checks internal consistency only. A missing backend URL or key is
    /// not rejected here; it shows up as a failed request on first use.
    pub fn validate(&self) -> Result<()> {
        if self.session.ttl_seconds == 0 {
            anyhow::bail!("session.ttl_seconds must be > 0");
        }

        if self.session.countdown_seconds == 0 {
            anyhow::bail!("session.countdown_seconds must be > 0");
        }

        if self.session.fallback_payload_chars > self.session.max_payload_chars {
            anyhow::bail!(
                "session.fallback_payload_chars ({}) cannot exceed session.max_payload_chars ({})",
                self.session.fallback_payload_chars,
                self.session.max_payload_chars
            );
        }

        if self.backend.table.trim().is_empty() {
            anyhow::bail!("backend.table cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.ttl_seconds, 300);
        assert_eq!(config.session.countdown_seconds, 300);
        assert_eq!(config.session.max_payload_chars, 5000);
        assert_eq!(config.session.fallback_payload_chars, 1000);
        assert_eq!(config.backend.table, "qr_data");
        assert!(config.general.sweep_on_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[backend]"));
        assert!(toml_str.contains("[session]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"
            log_format = "json"

            [backend]
            url = "https://demo.supabase.co"

            [session]
            countdown_seconds = 60
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, LogFormat::Json);
        assert_eq!(config.backend.url, "https://demo.supabase.co");
        assert_eq!(config.session.countdown_seconds, 60);

        assert_eq!(config.session.ttl_seconds, 300);
        assert_eq!(config.backend.table, "qr_data");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NEXT_PUBLIC_SUPABASE_URL", "https://legacy.supabase.co"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "legacy-key"),
            ("QRSYNC_BACKEND_KEY", "preferred-key"),
            ("QRSYNC_TABLE", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|name| vars.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.backend.url, "https://legacy.supabase.co");
        assert_eq!(config.backend.api_key, "preferred-key");
        assert_eq!(config.backend.table, "qr_data");
    }

    #[test]
    fn test_validate_rejects_inconsistent_limits() {
        let mut config = Config::default();
        config.session.fallback_payload_chars = 6000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.countdown_seconds = 0;
        assert!(config.validate().is_err());
    }
}
