use async_trait::async_trait;
use std::time::Instant;
use tracing::{error, info, warn};

use super::phases::run_phase;
use super::{DEFAULT, Plugin};
use crate::pipeline::{
    AbortSignal, BuildContext, BuildError, BuildOptions, BuildResult, BuildState, Phase,
};

/// The `default` plugin: pre-build, the job's own plugin, post-build
///
/// Phases run strictly in order and the first failure skips the rest.
/// The context ends in [`BuildState::Done`] or [`BuildState::Failed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildPipeline;

impl BuildPipeline {
    async fn run_phases(
        &self,
        context: &mut BuildContext,
        options: &BuildOptions,
        abort: &AbortSignal,
    ) -> BuildResult {
        context.transition(BuildState::PreBuild);
        run_phase(context, Phase::PreBuild, abort).await?;

        context.transition(BuildState::PluginBody);
        if context.plugin == DEFAULT {
            return Err(BuildError::Config(format!(
                "plugin '{DEFAULT}' cannot run itself as the job plugin"
            )));
        }
        let plugin = context
            .registry()
            .lookup(&context.plugin)
            .ok_or_else(|| BuildError::PluginNotFound {
                name: context.plugin.clone(),
            })?;
        info!(job_id = %context.job_id, plugin = %context.plugin, "Running job plugin");
        plugin.run(context, options, abort).await?;

        context.transition(BuildState::PostBuild);
        run_phase(context, Phase::PostBuild, abort).await
    }
}

#[async_trait]
impl Plugin for BuildPipeline {
    fn description(&self) -> &str {
        "Run pre-build, the job's plugin, then post-build"
    }

    async fn run(
        &self,
        context: &mut BuildContext,
        options: &BuildOptions,
        abort: &AbortSignal,
    ) -> BuildResult {
        let start = Instant::now();
        info!(job_id = %context.job_id, plugin = %context.plugin, "Starting build");

        let result = self.run_phases(context, options, abort).await;
        let failed_in = context.state();
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(()) => {
                context.transition(BuildState::Done);
                info!(job_id = %context.job_id, duration_ms, "Build succeeded");
            }
            Err(e) if e.is_cancelled() => {
                context.transition(BuildState::Failed);
                warn!(job_id = %context.job_id, state = %failed_in, duration_ms, "Build cancelled");
            }
            Err(e) => {
                context.transition(BuildState::Failed);
                error!(job_id = %context.job_id, state = %failed_in, duration_ms, error = %e, "Build failed");
            }
        }
        result
    }
}
