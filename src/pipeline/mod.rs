//! Build domain types and logic

pub mod abort;
pub mod context;
pub mod errors;
pub mod job;
pub mod step;
pub mod types;

pub use abort::{AbortHandle, AbortSignal, abort_channel};
pub use context::{BuildContext, BuildOptions};
pub use errors::{BuildError, BuildResult};
pub use job::JobDefinition;
pub use step::{ScriptStepProvider, StepDescriptor, StepProvider};
pub use types::{BuildState, ImageKind, Phase};
