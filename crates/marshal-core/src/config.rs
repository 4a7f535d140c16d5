use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MarshalError, Result};

/// Top-level configuration for the Marshal application.
///
/// Loaded from `~/.marshal/config.toml` by default. SMTP settings may also be
/// supplied through the `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER` and `SMTP_PASS`
/// environment variables, which take precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarshalConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl MarshalConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MarshalConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MarshalError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay SMTP settings from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SMTP_HOST") {
            self.smtp.host = host;
        }
        if let Some(port) = lookup("SMTP_PORT") {
            self.smtp.port = port
                .parse()
                .map_err(|_| MarshalError::Config(format!("Invalid SMTP_PORT: {}", port)))?;
        }
        if let Some(user) = lookup("SMTP_USER") {
            self.smtp.user = user;
        }
        if let Some(password) = lookup("SMTP_PASS") {
            self.smtp.password = password;
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "~/.marshal/marshal.db".to_string(),
        }
    }
}

/// SMTP transport settings for the email channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Sender address. Falls back to `user` when empty.
    pub from: String,
    pub subject: String,
}

impl SmtpConfig {
    /// The address mail is sent from.
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.user
        } else {
            &self.from
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from: String::new(),
            subject: "System notification".to_string(),
        }
    }
}

/// Webhook channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub content_type: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            content_type: "application/json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = MarshalConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.storage.database_path, "~/.marshal/marshal.db");
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.subject, "System notification");
        assert_eq!(config.webhook.content_type, "application/json");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[storage]
database_path = "/var/lib/marshal/marshal.db"

[smtp]
host = "smtp.example.com"
port = 2525
user = "alerts@example.com"
password = "hunter2"
"#;
        let file = create_temp_config(content);
        let config = MarshalConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.storage.database_path, "/var/lib/marshal/marshal.db");
        assert_eq!(config.smtp.host, "smtp.example.com");
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.smtp.sender(), "alerts@example.com");
        // Missing keys inside a section fall back to defaults.
        assert_eq!(config.smtp.subject, "System notification");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[smtp\nhost = ");
        let err = MarshalConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, MarshalError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = MarshalConfig::load_or_default(Path::new("/nonexistent/marshal.toml"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = MarshalConfig::default();
        config.smtp.host = "mail.internal".to_string();
        config.save(&path).unwrap();

        let loaded = MarshalConfig::load(&path).unwrap();
        assert_eq!(loaded.smtp.host, "mail.internal");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SMTP_HOST", "smtp.env.example"),
            ("SMTP_PORT", "465"),
            ("SMTP_USER", "bot@env.example"),
            ("SMTP_PASS", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = MarshalConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.smtp.host, "smtp.env.example");
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.smtp.user, "bot@env.example");
        assert_eq!(config.smtp.password, "secret");
    }

    #[test]
    fn test_env_override_bad_port() {
        let mut config = MarshalConfig::default();
        let err = config
            .apply_overrides(|key| (key == "SMTP_PORT").then(|| "smtp".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid SMTP_PORT"));
    }

    #[test]
    fn test_sender_prefers_from() {
        let smtp = SmtpConfig {
            user: "login@example.com".to_string(),
            from: "noreply@example.com".to_string(),
            ..SmtpConfig::default()
        };
        assert_eq!(smtp.sender(), "noreply@example.com");
    }
}
