//! Kernel configuration
//!
//! Loaded from an optional TOML file, then overridden by the `LLM_*`
//! environment variables, then by command-line flags in the binary.

use crate::core::error::{KernelError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "gemma3:12b";

/// Top-level kernel configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub store: StoreConfig,
    pub inference: InferenceConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
}

/// Flat store persistence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file; `None` keeps the store in memory only
    pub path: Option<PathBuf>,
}

/// Account storage
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JSON file holding user records; `None` keeps accounts in memory
    pub path: Option<PathBuf>,
}

/// External inference collaborator
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Upper bound on a single inference round trip
    pub timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Per-session defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial working directory
    pub home: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { home: "/".into() }
    }
}

impl KernelConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| KernelError::Config(e.to_string()))
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KernelError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Apply `LLM_API_KEY`, `LLM_API_URL` and `LLM_MODEL` overrides
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.inference.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("LLM_API_URL") {
            self.inference.api_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.inference.model = model;
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.inference.timeout_ms == 0 {
            return Err(KernelError::Config("inference.timeout_ms must be positive".into()));
        }
        if self.inference.model.trim().is_empty() {
            return Err(KernelError::Config("inference.model must not be empty".into()));
        }
        if !self.session.home.starts_with('/') {
            return Err(KernelError::Config(format!(
                "session.home must be absolute, got {:?}",
                self.session.home
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = KernelConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.inference.timeout(), Duration::from_secs(30));
        assert!(config.store.path.is_none());
        assert!(config.auth.path.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config = KernelConfig::from_toml_str(
            r#"
            [inference]
            model = "llama3"
            timeout_ms = 500

            [store]
            path = "/tmp/system.json"

            [auth]
            path = "/tmp/users.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.inference.model, "llama3");
        assert_eq!(config.inference.api_url, DEFAULT_API_URL);
        assert_eq!(config.inference.timeout_ms, 500);
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/system.json")));
        assert_eq!(config.session.home, "/");
        assert_eq!(config.auth.path, Some(PathBuf::from("/tmp/users.json")));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = KernelConfig::new();
        config.inference.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(KernelError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_relative_home() {
        let mut config = KernelConfig::new();
        config.session.home = "home".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml() {
        assert!(KernelConfig::from_toml_str("[inference\nmodel=").is_err());
    }
}
