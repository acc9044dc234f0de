use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::countdown::EventTarget;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Event date, "YYYY-MM-DD"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,

    /// Event start time, "HH:MM" 24-hour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time: Option<String>,

    /// Session file issued by the account service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,

    /// Desktop notification when a profile update fails
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_notifications() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_date: None,
            target_time: None,
            session_file: None,
            notifications: true,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("kigen");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        // Clean up the config before saving
        let mut clean_config = self.clone();

        // A target that no longer parses as a date/time pair is dropped
        // rather than persisted
        let valid = match (&clean_config.target_date, &clean_config.target_time) {
            (Some(d), Some(t)) => EventTarget::parse(d, t).is_ok(),
            (None, None) => true,
            _ => false,
        };
        if !valid {
            clean_config.target_date = None;
            clean_config.target_time = None;
        }

        let content = toml::to_string_pretty(&clean_config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            target_date: Some("2026-09-01".to_string()),
            target_time: Some("18:30".to_string()),
            session_file: Some(PathBuf::from("/tmp/session.toml")),
            notifications: false,
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config.target_date, deserialized.target_date);
        assert_eq!(config.target_time, deserialized.target_time);
        assert_eq!(config.session_file, deserialized.session_file);
        assert!(!deserialized.notifications);
    }

    #[test]
    fn notifications_default_on() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.notifications);
        assert!(AppConfig::default().notifications);
    }
}
