//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::pipeline::BuildError;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Shell steps are fed to, locally and remotely
    pub shell: String,
    /// Plugin run when a job does not name one
    pub default_plugin: String,
    /// Seconds between remote dial attempts
    pub connect_retry_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            shell: "sh".to_string(),
            default_plugin: "script".to_string(),
            connect_retry_interval_secs: 3,
        }
    }
}

impl Config {
    /// Loads a YAML configuration file; missing fields take defaults
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] if the file cannot be read and
    /// [`BuildError::Config`] if it is not valid YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BuildError::Io(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&raw)
    }

    /// Parses configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] on malformed input.
    pub fn from_yaml(raw: &str) -> Result<Self, BuildError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| BuildError::Config(format!("invalid config: {e}")))
    }

    /// Interval between remote dial attempts
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.connect_retry_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.shell, "sh");
        assert_eq!(config.default_plugin, "script");
        assert_eq!(config.retry_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level: debug\nshell: bash").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config,
            Config {
                log_level: "debug".into(),
                shell: "bash".into(),
                ..Config::default()
            }
        );
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(Config::load(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, BuildError::Io(_)));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let err = Config::from_yaml("connect_retry_interval_secs: soon").unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }
}
