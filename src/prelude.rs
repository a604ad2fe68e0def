//! Prelude module for common imports

pub use crate::executor::{LocalRunner, RemoteRunner, StepRunner, run_step};
pub use crate::pipeline::{
    AbortHandle, AbortSignal, BuildContext, BuildError, BuildOptions, BuildResult, BuildState,
    ImageKind, JobDefinition, Phase, ScriptStepProvider, StepDescriptor, StepProvider,
    abort_channel,
};
pub use crate::plugins::{Plugin, PluginRegistry};
pub use crate::remote::{RemoteCommand, RemoteError, RemoteExecutor, RemoteSessionConfig};
