//! Generation configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via FSMGEN_CONFIG)
//! 3. Environment variables
//!
//! ```yaml
//! autogenerated_message: "Generated by fsmgen, do not edit!"
//! default_event_types: ["!test"]
//! targets:
//!   c:
//!     event_types: ["c", "!test"]
//!   python:
//!     description: Python bindings
//!     event_types: ["py"]
//! ```

use crate::machine::{is_safe_message, DEFAULT_AUTOGENERATED_MESSAGE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Warning stamped into generated files.
    pub autogenerated_message: String,
    /// Specifiers used when a caller asks for the default target.
    pub default_event_types: Vec<String>,
    /// Named generation targets.
    pub targets: BTreeMap<String, TargetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autogenerated_message: DEFAULT_AUTOGENERATED_MESSAGE.to_string(),
            default_event_types: Vec::new(),
            targets: BTreeMap::new(),
        }
    }
}

/// One generation target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub description: String,
    /// Event type specifiers; `!tag` excludes.
    pub event_types: Vec<String>,
}

/// Name under which [`Config::default_event_types`] is addressable.
pub const DEFAULT_TARGET: &str = "default";

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("FSMGEN_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Self::from_yaml_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Parses configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(message) = std::env::var("FSMGEN_AUTOGENERATED_MESSAGE") {
            self.autogenerated_message = message;
        }

        if let Ok(types) = std::env::var("FSMGEN_EVENT_TYPES") {
            self.default_event_types = split_specifiers(&types);
        }
    }

    /// Checks the autogenerated message is in the safe character set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_safe_message(&self.autogenerated_message) {
            return Err(ConfigError::ValidationError(format!(
                "autogenerated_message contains unsafe characters: {:?}",
                self.autogenerated_message
            )));
        }
        Ok(())
    }

    /// Specifiers for a named target. `default` falls back to
    /// `default_event_types` unless a target of that name is configured.
    pub fn specifiers_for(&self, target: &str) -> Option<Vec<String>> {
        match self.targets.get(target) {
            Some(t) => Some(t.event_types.clone()),
            None if target == DEFAULT_TARGET => Some(self.default_event_types.clone()),
            None => None,
        }
    }
}

/// Splits a comma separated specifier list, dropping empty entries.
fn split_specifiers(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
autogenerated_message: "Generated by fsmgen, do not edit!"
default_event_types: ["!test"]
targets:
  c:
    event_types: ["c", "!test"]
  python:
    description: Python bindings
    event_types: ["py"]
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.autogenerated_message, DEFAULT_AUTOGENERATED_MESSAGE);
        assert!(config.targets.is_empty());
        assert_eq!(config.specifiers_for(DEFAULT_TARGET), Some(vec![]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_targets() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            config.specifiers_for("c"),
            Some(vec!["c".to_string(), "!test".to_string()])
        );
        assert_eq!(config.targets["python"].description, "Python bindings");
        assert_eq!(config.specifiers_for("default"), Some(vec!["!test".to_string()]));
        assert_eq!(config.specifiers_for("cobol"), None);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fsmgen.yaml");

        let config = Config::from_yaml_str(SAMPLE).unwrap();
        config.save(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.autogenerated_message, config.autogenerated_message);
        assert_eq!(loaded.targets.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Config::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(..)));
    }

    #[test]
    fn test_unsafe_message_rejected() {
        let config = Config {
            autogenerated_message: "line\nbreak".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_split_specifiers() {
        assert_eq!(split_specifiers(" c, !test ,,py"), vec!["c", "!test", "py"]);
    }
}
