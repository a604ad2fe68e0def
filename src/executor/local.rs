use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::traits::StepRunner;
use crate::pipeline::{AbortSignal, BuildError, BuildResult, ImageKind, StepDescriptor};

/// Runner that executes steps on the host system
///
/// The step script is fed to `<shell> -s` on stdin with the step
/// environment applied on top of the inherited one.
#[derive(Debug, Clone)]
pub struct LocalRunner {
    /// Shell to use (default: sh)
    shell: String,

    /// Working directory, the current one when unset
    cwd: Option<PathBuf>,
}

impl LocalRunner {
    /// Creates a new local runner
    #[must_use]
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            cwd: None,
        }
    }

    /// Sets shell to use
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Sets current working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepRunner for LocalRunner {
    fn name(&self) -> &str {
        "local"
    }

    async fn run(&self, step: &StepDescriptor, image: ImageKind, abort: &AbortSignal) -> BuildResult {
        let mut command = Command::new(&self.shell);
        command
            .arg("-s")
            .envs(step.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| BuildError::StepFailed {
            image,
            code: None,
            message: format!("failed to start '{}': {e}", self.shell),
        })?;
        tracing::debug!(pid = ?child.id(), phase = %step.phase, "Started local step");

        // writes past the pipe buffer block until the shell reads them
        if let Some(mut stdin) = child.stdin.take() {
            let script = step.script.clone().into_bytes();
            tokio::spawn(async move {
                if let Err(err) = stdin.write_all(&script).await {
                    tracing::debug!(error = %err, "Shell stopped reading the script");
                }
            });
        }

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(BuildError::StepFailed {
                        image,
                        code: status.code(),
                        message: format!("{} step exited with {status}", step.phase),
                    })
                }
            }
            () = abort.aborted() => {
                if let Err(err) = child.kill().await {
                    tracing::warn!(error = %err, "Failed to kill local step");
                }
                Err(BuildError::Cancelled)
            }
        }
    }
}
