//! Plugin registry
//!
//! Maps plugin names to implementations. Populated once while the process
//! starts, then shared read-only (behind an `Arc`) by every job.

use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

use super::{
    ARTIFACTS, BuildPipeline, CLONE, DEFAULT, PARALLEL, ParallelPlugin, Plugin, SCRIPT,
    SinglePhasePlugin,
};
use crate::pipeline::{AbortSignal, BuildContext, BuildError, BuildOptions, BuildResult, Phase};

/// Registry for build plugins
///
/// Registering a name twice is rejected, so resolution never depends on
/// registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: AHashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Creates a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: AHashMap::new(),
        }
    }

    /// Creates a registry holding the built-in plugins
    #[must_use]
    pub fn with_builtin() -> Self {
        let builtin: [(&str, Arc<dyn Plugin>); 5] = [
            (CLONE, Arc::new(SinglePhasePlugin::new(Phase::PreBuild))),
            (SCRIPT, Arc::new(SinglePhasePlugin::new(Phase::Build))),
            (ARTIFACTS, Arc::new(SinglePhasePlugin::new(Phase::PostBuild))),
            (DEFAULT, Arc::new(BuildPipeline)),
            (PARALLEL, Arc::new(ParallelPlugin)),
        ];
        Self {
            plugins: builtin
                .into_iter()
                .map(|(name, plugin)| (name.to_string(), plugin))
                .collect(),
        }
    }

    /// Registers a plugin under `name`
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicatePlugin`] if `name` is taken; the
    /// existing entry is kept.
    pub fn register<P: Plugin + 'static>(&mut self, name: impl Into<String>, plugin: P) -> BuildResult {
        let name = name.into();
        if self.plugins.contains_key(&name) {
            return Err(BuildError::DuplicatePlugin { name });
        }
        tracing::debug!(plugin = %name, "Registered plugin");
        self.plugins.insert(name, Arc::new(plugin));
        Ok(())
    }

    /// Gets a plugin by name
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }

    /// Checks if a plugin exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Gets all registered plugin names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered plugins
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Resolves `entry` and runs it
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::PluginNotFound`] if `entry` is not registered,
    /// otherwise whatever the plugin returns.
    pub async fn dispatch(
        &self,
        entry: &str,
        context: &mut BuildContext,
        options: &BuildOptions,
        abort: &AbortSignal,
    ) -> BuildResult {
        let plugin = self.lookup(entry).ok_or_else(|| BuildError::PluginNotFound {
            name: entry.to_string(),
        })?;
        tracing::info!(job_id = %context.job_id, plugin = entry, "Dispatching job");
        plugin.run(context, options, abort).await
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
