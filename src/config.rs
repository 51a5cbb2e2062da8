//! Configuration file handling
//!
//! Loads and manages the ~/.config/dropmail/config.yaml file. Every field
//! has a serde default so a missing or partial file still yields a working
//! relay.

use crate::registry::ProviderKind;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upstream call timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Timeout for generation and domain-listing calls, in seconds
    #[serde(default = "default_generate_timeout")]
    pub generate_timeout_secs: u64,

    /// Timeout for message listing and reading calls, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_generate_timeout() -> u64 {
    10
}

fn default_fetch_timeout() -> u64 {
    15
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            generate_timeout_secs: default_generate_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// DropMail configuration
///
/// Represents the complete ~/.config/dropmail/config.yaml file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropMailConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Provider used when a request names none
    #[serde(default)]
    pub default_provider: ProviderKind,

    /// Upstream timeouts
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for DropMailConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DropMailConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self {
            bind: default_bind(),
            default_provider: ProviderKind::default(),
            upstream: UpstreamConfig::default(),
        }
    }

    /// The default config path (~/.config/dropmail/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("dropmail");
        path.push("config.yaml");
        path
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::DropMailError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading DropMail configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            bind = %config.bind,
            default_provider = %config.default_provider,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load from the default path, falling back to defaults when the file
    /// does not exist
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    tracing::info!("No config file found, using defaults");
                    Ok(Self::new())
                }
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DropMailConfig::new();
        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(config.default_provider, ProviderKind::SecMail);
        assert_eq!(config.upstream.generate_timeout_secs, 10);
        assert_eq!(config.upstream.fetch_timeout_secs, 15);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");

        let mut config = DropMailConfig::new();
        config.bind = "0.0.0.0:8080".to_string();
        config.default_provider = ProviderKind::MailTm;
        config.save(&path).unwrap();

        let loaded = DropMailConfig::load(&path).unwrap();
        assert_eq!(loaded.bind, "0.0.0.0:8080");
        assert_eq!(loaded.default_provider, ProviderKind::MailTm);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "bind: \"127.0.0.1:9999\"\n").unwrap();

        let loaded = DropMailConfig::load(&path).unwrap();
        assert_eq!(loaded.bind, "127.0.0.1:9999");
        assert_eq!(loaded.default_provider, ProviderKind::SecMail);
        assert_eq!(loaded.upstream.fetch_timeout_secs, 15);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.yaml");
        assert!(DropMailConfig::load(&missing).is_err());
    }

    #[test]
    fn test_load_or_default_with_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        DropMailConfig::new().save(&path).unwrap();

        let loaded = DropMailConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(loaded.bind, "127.0.0.1:3000");
    }
}
