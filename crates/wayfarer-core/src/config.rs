use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WayfarerError};

/// Top-level configuration for the Wayfarer application.
///
/// Loaded from `~/.wayfarer/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WayfarerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub itinerary: ItineraryConfig,
}

impl WayfarerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WayfarerConfig = toml::from_str(&content)?;
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
            toml::to_string_pretty(self).map_err(|e| WayfarerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
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

/// Conversational assistant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Whether the assistant is offered at all.
    pub enabled: bool,
    /// Backend model identifier.
    pub model: String,
    /// Backend base URL, without a trailing slash.
    pub base_url: String,
    /// Name of the environment variable holding the API key. The key itself
    /// is never stored in the config file.
    pub api_key_env: String,
    /// Destination the assistant specializes in.
    pub destination: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gemini-2.5-flash-preview-04-17".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "API_KEY".to_string(),
            destination: "Japan".to_string(),
        }
    }
}

impl AssistantConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// An unset or blank variable counts as absent.
    pub fn read_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Welcome line shown when a session starts healthy.
    pub fn welcome_message(&self) -> String {
        format!(
            "Welcome! Ask me anything about your {} trip. I can also help you add spots to your itinerary!",
            self.destination
        )
    }

    /// Persistent banner shown when the API key is missing.
    pub fn missing_key_banner(&self) -> String {
        format!(
            "{0} is not configured for the AI Chat. Please set the {0} environment variable.",
            self.api_key_env
        )
    }
}

/// Itinerary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItineraryConfig {
    /// Start with a handful of demo spots.
    pub seed_demo_spots: bool,
}

impl Default for ItineraryConfig {
    fn default() -> Self {
        Self {
            seed_demo_spots: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = WayfarerConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert!(config.assistant.enabled);
        assert_eq!(config.assistant.model, "gemini-2.5-flash-preview-04-17");
        assert_eq!(config.assistant.api_key_env, "API_KEY");
        assert_eq!(config.assistant.destination, "Japan");
        assert!(config.itinerary.seed_demo_spots);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[assistant]
enabled = true
model = "gemini-2.0-flash"
base_url = "http://localhost:8080"
api_key_env = "WAYFARER_TEST_KEY"
destination = "Iceland"

[itinerary]
seed_demo_spots = false
"#;
        let file = create_temp_config(content);
        let config = WayfarerConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.assistant.model, "gemini-2.0-flash");
        assert_eq!(config.assistant.base_url, "http://localhost:8080");
        assert_eq!(config.assistant.destination, "Iceland");
        assert!(!config.itinerary.seed_demo_spots);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[assistant]
destination = "Korea"
"#;
        let file = create_temp_config(content);
        let config = WayfarerConfig::load(file.path()).unwrap();
        assert_eq!(config.assistant.destination, "Korea");
        // Remaining fields use defaults
        assert_eq!(config.assistant.api_key_env, "API_KEY");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = WayfarerConfig::load_or_default(Path::new("/nonexistent/wayfarer.toml"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is [not valid");
        let result = WayfarerConfig::load(file.path());
        assert!(matches!(result, Err(WayfarerError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = WayfarerConfig::default();
        config.assistant.destination = "Portugal".to_string();
        config.save(&path).unwrap();

        let reloaded = WayfarerConfig::load(&path).unwrap();
        assert_eq!(reloaded.assistant.destination, "Portugal");
        assert_eq!(reloaded.assistant.model, config.assistant.model);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = WayfarerConfig::load(file.path()).unwrap();
        assert!(config.assistant.enabled);
        assert!(config.itinerary.seed_demo_spots);
    }

    #[test]
    fn test_read_api_key_unset_is_none() {
        let config = AssistantConfig {
            api_key_env: "WAYFARER_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..AssistantConfig::default()
        };
        assert!(config.read_api_key().is_none());
    }

    #[test]
    fn test_welcome_and_banner_text() {
        let config = AssistantConfig::default();
        assert_eq!(
            config.welcome_message(),
            "Welcome! Ask me anything about your Japan trip. I can also help you add spots to your itinerary!"
        );
        assert_eq!(
            config.missing_key_banner(),
            "API_KEY is not configured for the AI Chat. Please set the API_KEY environment variable."
        );
    }
}
