//! Per-job execution context and options

use ahash::AHashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::BuildError;
use super::step::StepProvider;
use super::types::BuildState;
use crate::executor::StepRunner;
use crate::plugins::PluginRegistry;

/// Identifies one job execution
///
/// Owned by exactly one pipeline run. Plugins receive it mutably so the
/// pipeline can record which state the run is in.
pub struct BuildContext {
    /// Unique id of this run
    pub job_id: Uuid,

    /// Name of the plugin the job selected
    pub plugin: String,

    provider: Arc<dyn StepProvider>,
    runner: Arc<dyn StepRunner>,
    registry: Arc<PluginRegistry>,
    state: BuildState,
}

impl BuildContext {
    /// Creates a new context for a job selecting `plugin`
    #[must_use]
    pub fn new(
        plugin: impl Into<String>,
        provider: Arc<dyn StepProvider>,
        runner: Arc<dyn StepRunner>,
        registry: Arc<PluginRegistry>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            plugin: plugin.into(),
            provider,
            runner,
            registry,
            state: BuildState::Init,
        }
    }

    /// Step provider for this job
    #[must_use]
    pub fn provider(&self) -> Arc<dyn StepProvider> {
        Arc::clone(&self.provider)
    }

    /// Runner steps of this job execute on
    #[must_use]
    pub fn runner(&self) -> Arc<dyn StepRunner> {
        Arc::clone(&self.runner)
    }

    /// Registry plugins are resolved from
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Current state of the run
    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Moves the run to `next`
    ///
    /// Illegal moves are ignored and logged; they can only come from a
    /// plugin re-entering a phase it does not own.
    pub fn transition(&mut self, next: BuildState) {
        if self.state.can_transition_to(next) {
            tracing::debug!(job_id = %self.job_id, from = %self.state, to = %next, "Build state change");
            self.state = next;
        } else {
            tracing::trace!(job_id = %self.job_id, from = %self.state, to = %next, "Ignoring state change");
        }
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("job_id", &self.job_id)
            .field("plugin", &self.plugin)
            .field("runner", &self.runner.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Read-only key/value options scoped to one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    values: AHashMap<String, String>,
}

impl BuildOptions {
    /// Creates an empty option bag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Gets an option by name
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parses a required option
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] if the option is missing or unparsable.
    pub fn require<T>(&self, key: &str) -> Result<T, BuildError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self
            .get(key)
            .ok_or_else(|| BuildError::Config(format!("missing option '{key}'")))?;
        raw.trim()
            .parse()
            .map_err(|e| BuildError::Config(format!("invalid option '{key}' = '{raw}': {e}")))
    }

    /// Number of options
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no options
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
