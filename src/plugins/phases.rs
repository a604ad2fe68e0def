use async_trait::async_trait;

use super::Plugin;
use crate::executor::run_step;
use crate::pipeline::{AbortSignal, BuildContext, BuildOptions, BuildResult, Phase};

/// Runs the step of one phase
///
/// Backs the `clone`, `script` and `artifacts` plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinglePhasePlugin {
    phase: Phase,
}

impl SinglePhasePlugin {
    /// Creates a plugin running `phase`
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self { phase }
    }

    /// Phase this plugin runs
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }
}

#[async_trait]
impl Plugin for SinglePhasePlugin {
    fn description(&self) -> &str {
        match self.phase {
            Phase::PreBuild => "Prepare the workspace (pre-build step only)",
            Phase::Build => "Run the job's commands (build step only)",
            Phase::PostBuild => "Collect artifacts (post-build step only)",
        }
    }

    async fn run(&self, context: &mut BuildContext, _options: &BuildOptions, abort: &AbortSignal) -> BuildResult {
        run_phase(context, self.phase, abort).await
    }
}

/// Asks the provider for the step of `phase` and runs it with the phase's image
pub(crate) async fn run_phase(context: &BuildContext, phase: Phase, abort: &AbortSignal) -> BuildResult {
    let step = context.provider().step_for(phase, context)?;
    run_step(context.runner(), step, phase.image(), abort).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::RecordingRunner;
    use crate::pipeline::{BuildError, ImageKind, ScriptStepProvider, abort_channel};
    use crate::plugins::{ARTIFACTS, CLONE, PluginRegistry, SCRIPT};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn context(runner: Arc<RecordingRunner>, build: &[&str]) -> BuildContext {
        let provider = ScriptStepProvider::new(
            vec!["git fetch".into()],
            build.iter().map(ToString::to_string).collect(),
            vec!["tar czf out.tgz out".into()],
        );
        BuildContext::new(SCRIPT, Arc::new(provider), runner, Arc::new(PluginRegistry::with_builtin()))
    }

    async fn run_named(name: &str, runner: &Arc<RecordingRunner>) -> BuildResult {
        let mut ctx = context(Arc::clone(runner), &["make"]);
        let (_handle, abort) = abort_channel();
        let plugin = ctx.registry().lookup(name).unwrap();
        plugin.run(&mut ctx, &BuildOptions::new(), &abort).await
    }

    #[tokio::test]
    async fn test_clone_runs_only_pre_build() {
        let runner = Arc::new(RecordingRunner::new());
        run_named(CLONE, &runner).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].phase, Phase::PreBuild);
        assert_eq!(calls[0].image, ImageKind::PreBuild);
    }

    #[tokio::test]
    async fn test_script_runs_only_build_with_default_image() {
        let runner = Arc::new(RecordingRunner::new());
        run_named(SCRIPT, &runner).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].phase, Phase::Build);
        assert_eq!(calls[0].image, ImageKind::Default);
    }

    #[tokio::test]
    async fn test_artifacts_runs_only_post_build() {
        let runner = Arc::new(RecordingRunner::new());
        run_named(ARTIFACTS, &runner).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].phase, Phase::PostBuild);
        assert_eq!(calls[0].image, ImageKind::PostBuild);
    }

    #[tokio::test]
    async fn test_setup_failure_runs_nothing() {
        let runner = Arc::new(RecordingRunner::new());
        let mut ctx = context(Arc::clone(&runner), &[]);
        let (_handle, abort) = abort_channel();

        let err = SinglePhasePlugin::new(Phase::Build)
            .run(&mut ctx, &BuildOptions::new(), &abort)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Setup { phase: Phase::Build, .. }));
        assert!(runner.calls().is_empty());
    }
}
