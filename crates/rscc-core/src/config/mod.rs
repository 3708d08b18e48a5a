//! Configuration management for rscc

mod settings;
mod supporters;
pub mod serde_utils;

pub use settings::{
    KeyServerConfig, ProgramsConfig, RsccConfig, TimingConfig, TraversalConfig, VncConfig,
};
pub use supporters::{Supporter, SupporterStore};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rscc")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_config() {
        let dir = TempDir::new().unwrap();
        let err = load_config::<RsccConfig>(&dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = RsccConfig::default();
        config.key_server.ip = "keys.example.org".to_string();
        config.vnc.view_only = true;
        save_config(&path, &config).unwrap();

        let loaded: RsccConfig = load_config(&path).unwrap();
        assert_eq!(loaded.key_server.ip, "keys.example.org");
        assert!(loaded.vnc.view_only);
        assert_eq!(loaded.timing.handshake_timeout, None);
    }
}
