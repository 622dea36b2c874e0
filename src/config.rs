use crate::models::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Configuration for the guardian daemon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log source configuration
    pub input: InputConfig,
    /// Reasoning service configuration
    pub classifier: ClassifierConfig,
    /// Which events are analysed and alerted on
    pub alerts: AlertConfig,
    /// Notification channel endpoints
    pub notifiers: NotifierConfig,
}

/// Log source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Path to the auth log to tail
    pub log_path: PathBuf,
    /// Seconds to wait between polls when nothing new was read
    pub poll_interval_secs: u64,
    /// Consecutive polls the file may be missing during rotation
    pub missing_file_grace_polls: u32,
}

/// Reasoning service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Ollama API base URL
    pub base_url: String,
    /// Model name to request
    pub model: String,
    pub temperature: f32,
    /// Upper bound for a single classification request
    pub timeout_secs: u64,
}

/// Alert filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub alert_on_failed_login: bool,
    pub alert_on_sudo: bool,
    /// Threats below this severity are not dispatched
    pub min_severity: Severity,
}

/// Notification channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub discord_webhook_url: Option<String>,
    pub slack_webhook_url: Option<String>,
    /// Per-request timeout for every channel
    pub timeout_secs: u64,
    /// Generic JSON webhooks
    pub webhooks: Vec<WebhookConfig>,
}

/// A generic webhook endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    /// "POST" (default) or "PUT"
    pub method: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            log_path: PathBuf::from("/var/log/auth.log"),
            poll_interval_secs: 1,
            missing_file_grace_polls: crate::input::DEFAULT_MISSING_GRACE_POLLS,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            temperature: 0.3,
            timeout_secs: 30,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            alert_on_failed_login: true,
            alert_on_sudo: true,
            min_severity: Severity::Low,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig {
            discord_webhook_url: None,
            slack_webhook_url: None,
            timeout_secs: 10,
            webhooks: Vec::new(),
        }
    }
}

impl InputConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether any channel has an endpoint configured
    pub fn has_channels(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.discord_webhook_url)
            || set(&self.slack_webhook_url)
            || self.webhooks.iter().any(|w| !w.url.is_empty())
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from process environment variables
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Recognised keys: `LOG_PATH`, `POLL_INTERVAL`, `OLLAMA_BASE_URL`,
    /// `OLLAMA_MODEL`, `DISCORD_WEBHOOK_URL`, `SLACK_WEBHOOK_URL`,
    /// `ALERT_ON_FAILED_LOGIN`, `ALERT_ON_SUDO` and `MIN_SEVERITY`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LOG_PATH") {
            self.input.log_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("POLL_INTERVAL") {
            self.input.poll_interval_secs = parse_value("POLL_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("OLLAMA_BASE_URL") {
            self.classifier.base_url = v;
        }
        if let Some(v) = lookup("OLLAMA_MODEL") {
            self.classifier.model = v;
        }
        if let Some(v) = lookup("DISCORD_WEBHOOK_URL") {
            self.notifiers.discord_webhook_url = Some(v);
        }
        if let Some(v) = lookup("SLACK_WEBHOOK_URL") {
            self.notifiers.slack_webhook_url = Some(v);
        }
        if let Some(v) = lookup("ALERT_ON_FAILED_LOGIN") {
            self.alerts.alert_on_failed_login = parse_bool("ALERT_ON_FAILED_LOGIN", &v)?;
        }
        if let Some(v) = lookup("ALERT_ON_SUDO") {
            self.alerts.alert_on_sudo = parse_bool("ALERT_ON_SUDO", &v)?;
        }
        if let Some(v) = lookup("MIN_SEVERITY") {
            self.alerts.min_severity = parse_value("MIN_SEVERITY", &v)?;
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.input.log_path, PathBuf::from("/var/log/auth.log"));
        assert_eq!(config.input.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.classifier.model, "llama3.1:8b");
        assert!(config.alerts.alert_on_failed_login);
        assert!(config.alerts.alert_on_sudo);
        assert!(!config.notifiers.has_channels());
    }

    #[test]
    fn test_round_trip_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guardian.toml");

        let mut config = Config::default();
        config.notifiers.slack_webhook_url = Some("https://hooks.slack.example/x".to_string());
        config.alerts.min_severity = Severity::High;
        config.to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guardian.toml");
        std::fs::write(
            &path,
            r#"
[input]
log_path = "/tmp/auth.log"

[alerts]
alert_on_sudo = false
min_severity = "medium"

[[notifiers.webhooks]]
name = "siem"
url = "https://siem.example/ingest"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.input.log_path, PathBuf::from("/tmp/auth.log"));
        assert_eq!(config.input.poll_interval_secs, 1);
        assert!(config.alerts.alert_on_failed_login);
        assert!(!config.alerts.alert_on_sudo);
        assert_eq!(config.alerts.min_severity, Severity::Medium);
        assert_eq!(config.notifiers.webhooks.len(), 1);
        assert!(config.notifiers.has_channels());
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guardian.toml");
        std::fs::write(&path, "[input\nlog_path = 3").unwrap();

        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LOG_PATH", "/srv/auth.log"),
            ("POLL_INTERVAL", "5"),
            ("OLLAMA_MODEL", "mistral"),
            ("DISCORD_WEBHOOK_URL", "https://discord.example/api/webhooks/1"),
            ("ALERT_ON_SUDO", "false"),
            ("MIN_SEVERITY", "HIGH"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.input.log_path, PathBuf::from("/srv/auth.log"));
        assert_eq!(config.input.poll_interval_secs, 5);
        assert_eq!(config.classifier.model, "mistral");
        assert!(config.notifiers.has_channels());
        assert!(!config.alerts.alert_on_sudo);
        assert_eq!(config.alerts.min_severity, Severity::High);
    }

    #[test]
    fn test_invalid_override() {
        let mut config = Config::default();
        let result = config.apply_overrides_from(|key| {
            (key == "POLL_INTERVAL").then(|| "soon".to_string())
        });

        match result {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "POLL_INTERVAL");
                assert_eq!(value, "soon");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }
}
