use async_trait::async_trait;
use std::sync::Arc;

use super::traits::StepRunner;
use crate::pipeline::{AbortSignal, BuildError, BuildResult, ImageKind, StepDescriptor};
use crate::remote::{RemoteCommand, RemoteExecutor};

/// Runner that executes steps on a remote host
///
/// The executor must already be connected; connection lifetime belongs to
/// whoever created it.
#[derive(Debug, Clone)]
pub struct RemoteRunner {
    executor: Arc<RemoteExecutor>,
    shell: String,
}

impl RemoteRunner {
    /// Creates a runner using `sh` on the remote side
    #[must_use]
    pub fn new(executor: Arc<RemoteExecutor>) -> Self {
        Self {
            executor,
            shell: "sh".to_string(),
        }
    }

    /// Sets the remote shell
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Builds the remote command for `step`
    #[must_use]
    pub fn command_for(&self, step: &StepDescriptor) -> RemoteCommand {
        RemoteCommand {
            environment: step.env_entries(),
            command: format!("{} -s", self.shell),
            stdin: step.script.clone().into_bytes(),
            stdout: Box::new(tokio::io::stdout()),
            stderr: Box::new(tokio::io::stderr()),
        }
    }
}

#[async_trait]
impl StepRunner for RemoteRunner {
    fn name(&self) -> &str {
        "remote"
    }

    async fn run(&self, step: &StepDescriptor, image: ImageKind, abort: &AbortSignal) -> BuildResult {
        tracing::debug!(
            host = %self.executor.config().address(),
            phase = %step.phase,
            "Running step remotely"
        );
        self.executor
            .run(self.command_for(step), abort)
            .await
            .map_err(|e| BuildError::from_remote(image, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Phase, abort_channel};
    use crate::remote::testing::FakeConnector;
    use crate::remote::{RemoteError, RemoteSessionConfig};
    use pretty_assertions::assert_eq;

    fn executor(connector: &Arc<FakeConnector>) -> Arc<RemoteExecutor> {
        let config = RemoteSessionConfig::new("ci-box").with_password("pw");
        Arc::new(RemoteExecutor::with_connector(config, connector.clone()))
    }

    #[tokio::test]
    async fn test_step_becomes_remote_command() {
        let connector = Arc::new(FakeConnector::new());
        let executor = executor(&connector);
        executor.connect().await.unwrap();
        let (_handle, abort) = abort_channel();

        let step = StepDescriptor::new(Phase::Build, "set -e\nmake\n").with_env("TARGET", "x86 64");
        RemoteRunner::new(executor)
            .with_shell("bash")
            .run(&step, ImageKind::Default, &abort)
            .await
            .unwrap();

        assert_eq!(connector.commands(), vec!["bash -s".to_string()]);
        assert_eq!(
            String::from_utf8(connector.inputs().remove(0)).unwrap(),
            "export TARGET='x86 64'\nset -e\nmake\n"
        );
    }

    #[tokio::test]
    async fn test_exit_status_is_step_failure() {
        let connector = Arc::new(FakeConnector::new().with_exit_status(2));
        let executor = executor(&connector);
        executor.connect().await.unwrap();
        let (_handle, abort) = abort_channel();

        let err = RemoteRunner::new(executor)
            .run(&StepDescriptor::new(Phase::PostBuild, "x"), ImageKind::PostBuild, &abort)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::StepFailed {
                image: ImageKind::PostBuild,
                code: Some(2),
                ..
            }
        ));
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_disconnected_executor() {
        let connector = Arc::new(FakeConnector::new());
        let (_handle, abort) = abort_channel();

        let err = RemoteRunner::new(executor(&connector))
            .run(&StepDescriptor::new(Phase::Build, "x"), ImageKind::Default, &abort)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Remote(RemoteError::NotConnected)));
        assert_eq!(connector.sessions_opened(), 0);
    }
}
