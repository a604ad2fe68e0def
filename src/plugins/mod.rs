//! Build plugins
//!
//! A plugin is a named strategy a job selects by configuration. Every
//! plugin has the same shape, `run(context, options, abort)`, so the
//! pipeline can dispatch by name without knowing concrete types.
//!
//! | Name        | Runs                                              |
//! |-------------|---------------------------------------------------|
//! | `clone`     | the pre-build step with the pre-build image       |
//! | `script`    | the build step with the default image             |
//! | `artifacts` | the post-build step with the post-build image     |
//! | `default`   | pre-build, the job's own plugin, then post-build  |
//! | `parallel`  | the build step on `steps` concurrent units        |

use async_trait::async_trait;

use crate::pipeline::{AbortSignal, BuildContext, BuildOptions, BuildResult};

mod parallel;
mod phases;
mod pipeline;
mod registry;

pub use parallel::{MAX_UNITS, NODE_INDEX_VAR, NODE_TOTAL_VAR, ParallelPlugin, STEPS_OPTION};
pub use phases::SinglePhasePlugin;
pub use pipeline::BuildPipeline;
pub use registry::PluginRegistry;

/// Name of the workspace preparation plugin
pub const CLONE: &str = "clone";
/// Name of the plugin running the job's commands
pub const SCRIPT: &str = "script";
/// Name of the artifact collection plugin
pub const ARTIFACTS: &str = "artifacts";
/// Name of the full three-phase pipeline
pub const DEFAULT: &str = "default";
/// Name of the fan-out plugin
pub const PARALLEL: &str = "parallel";

/// Trait for build plugins
#[allow(clippy::missing_errors_doc)]
#[async_trait]
pub trait Plugin: Send + Sync {
    /// One-line description shown by `buildline plugins`
    fn description(&self) -> &str;

    /// Executes the plugin for one job
    async fn run(
        &self,
        context: &mut BuildContext,
        options: &BuildOptions,
        abort: &AbortSignal,
    ) -> BuildResult;
}
