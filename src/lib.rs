//! # Buildline - a CI build-job runner
//!
//! Buildline runs a build job as a short pipeline of shell steps: a
//! pre-build step that prepares the workspace, the job's own plugin, and a
//! post-build step that collects artifacts. Steps run locally or on a
//! remote build host over SSH.
//!
//! ## Layout
//!
//! - [`pipeline`]: build context, options, step descriptors, job files,
//!   the abort signal and the error taxonomy
//! - [`plugins`]: the [`Plugin`](plugins::Plugin) trait, the registry and
//!   the built-in plugins
//! - [`executor`]: the step-execution primitive and step runners
//! - [`remote`]: remote session configuration and command execution
//! - [`infrastructure`]: configuration file and logging setup
//!
//! ## Example
//!
//! ```no_run
//! use buildline::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> BuildResult {
//! let job = JobDefinition::from_yaml("script: [\"make test\"]")?;
//! let registry = Arc::new(PluginRegistry::with_builtin());
//! let mut context = BuildContext::new(
//!     "script",
//!     Arc::new(ScriptStepProvider::from_job(&job)),
//!     Arc::new(LocalRunner::new()),
//!     Arc::clone(&registry),
//! );
//! let (_handle, abort) = abort_channel();
//! registry.dispatch("default", &mut context, &job.build_options()?, &abort).await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod executor;
pub mod infrastructure;
pub mod pipeline;
pub mod plugins;
pub mod remote;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use executor::{LocalRunner, RemoteRunner, StepRunner, run_step};
pub use infrastructure::{Config, init_logging};
pub use pipeline::{
    AbortHandle, AbortSignal, BuildContext, BuildError, BuildOptions, BuildResult, BuildState,
    ImageKind, JobDefinition, Phase, ScriptStepProvider, StepDescriptor, StepProvider,
    abort_channel,
};
pub use plugins::{Plugin, PluginRegistry};
pub use remote::{RemoteCommand, RemoteError, RemoteExecutor, RemoteSessionConfig};

/// Version of the buildline crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
