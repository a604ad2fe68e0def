//! Job file definition
//!
//! A job file is YAML:
//!
//! ```yaml
//! name: unit-tests
//! plugin: parallel
//! options:
//!   steps: 3
//! variables:
//!   RUST_BACKTRACE: "1"
//! pre_build:
//!   - git submodule update --init
//! script:
//!   - cargo test
//! post_build:
//!   - tar czf target.tgz target/
//! remote:
//!   host: build-01.internal
//!   password: hunter2
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

use super::context::BuildOptions;
use super::errors::BuildError;
use crate::remote::RemoteSessionConfig;

/// A declared build job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDefinition {
    /// Display name
    pub name: Option<String>,

    /// Plugin the job selects; empty means the configured default
    pub plugin: String,

    /// Plugin options, scalars only
    pub options: BTreeMap<String, Value>,

    /// Variables exported to every step, in declaration order
    #[serde(with = "ordered_variables")]
    pub variables: Vec<(String, String)>,

    /// Workspace preparation lines
    pub pre_build: Vec<String>,

    /// The job's commands
    pub script: Vec<String>,

    /// Artifact collection lines
    pub post_build: Vec<String>,

    /// Run steps on this host instead of locally
    pub remote: Option<RemoteSessionConfig>,
}

impl JobDefinition {
    /// Parses a job from YAML text
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] if the text is not a valid job.
    pub fn from_yaml(text: &str) -> Result<Self, BuildError> {
        serde_yaml::from_str(text).map_err(|e| BuildError::Config(format!("invalid job file: {e}")))
    }

    /// Loads a job file from disk
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] if the file cannot be read and
    /// [`BuildError::Config`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Plugin name, falling back to `default_plugin` when unset
    #[must_use]
    pub fn plugin_or<'a>(&'a self, default_plugin: &'a str) -> &'a str {
        if self.plugin.trim().is_empty() {
            default_plugin
        } else {
            self.plugin.trim()
        }
    }

    /// Converts the declared options into a [`BuildOptions`] bag
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] for sequence or mapping values.
    pub fn build_options(&self) -> Result<BuildOptions, BuildError> {
        let mut options = BuildOptions::new();
        for (key, value) in &self.options {
            let rendered = scalar(value).ok_or_else(|| {
                BuildError::Config(format!("option '{key}' must be a scalar value"))
            })?;
            options = options.with(key.clone(), rendered);
        }
        Ok(options)
    }

    /// Value of a declared variable
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Keeps `variables` in file order; later exports may refer to earlier ones
mod ordered_variables {
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_yaml::{Mapping, Value};

    pub fn serialize<S: Serializer>(vars: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(vars.len()))?;
        for (key, value) in vars {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(String, String)>, D::Error> {
        let mapping = Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default();
        mapping
            .into_iter()
            .map(|(key, value)| {
                let key = match key {
                    Value::String(key) => key,
                    other => return Err(D::Error::custom(format!("variable name must be a string, got {other:?}"))),
                };
                let value = super::scalar(&value)
                    .ok_or_else(|| D::Error::custom(format!("variable '{key}' must be a scalar value")))?;
                Ok((key, value))
            })
            .collect()
    }
}
