//! Step descriptors and the providers that produce them

use super::context::BuildContext;
use super::errors::BuildError;
use super::job::JobDefinition;
use super::types::Phase;

/// An executable unit for one phase
///
/// The core never looks inside `script`; it only hands it to a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    /// Phase this step was generated for
    pub phase: Phase,

    /// Shell script fed to the runner's shell
    pub script: String,

    /// Environment variables, in declaration order
    pub env: Vec<(String, String)>,
}

impl StepDescriptor {
    /// Creates a step with no environment
    #[must_use]
    pub fn new(phase: Phase, script: impl Into<String>) -> Self {
        Self {
            phase,
            script: script.into(),
            env: Vec::new(),
        }
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Environment rendered as `NAME=value` entries
    #[must_use]
    pub fn env_entries(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

/// Produces the step for each phase of a job
///
/// Errors returned here are setup failures and are never retried.
#[allow(clippy::missing_errors_doc)]
pub trait StepProvider: Send + Sync {
    /// Step preparing the workspace
    fn pre_build(&self, context: &BuildContext) -> Result<StepDescriptor, BuildError>;

    /// Step running the job's commands
    fn build(&self, context: &BuildContext) -> Result<StepDescriptor, BuildError>;

    /// Step collecting artifacts
    fn post_build(&self, context: &BuildContext) -> Result<StepDescriptor, BuildError>;

    /// Dispatches on `phase`
    fn step_for(&self, phase: Phase, context: &BuildContext) -> Result<StepDescriptor, BuildError> {
        match phase {
            Phase::PreBuild => self.pre_build(context),
            Phase::Build => self.build(context),
            Phase::PostBuild => self.post_build(context),
        }
    }
}

/// Step provider backed by the script lines of a job file
#[derive(Debug, Clone, Default)]
pub struct ScriptStepProvider {
    pre_build: Vec<String>,
    build: Vec<String>,
    post_build: Vec<String>,
    variables: Vec<(String, String)>,
}

impl ScriptStepProvider {
    /// Creates a provider from explicit script lines
    #[must_use]
    pub fn new(pre_build: Vec<String>, build: Vec<String>, post_build: Vec<String>) -> Self {
        Self {
            pre_build,
            build,
            post_build,
            variables: Vec::new(),
        }
    }

    /// Creates a provider from a parsed job file
    #[must_use]
    pub fn from_job(job: &JobDefinition) -> Self {
        Self {
            pre_build: job.pre_build.clone(),
            build: job.script.clone(),
            post_build: job.post_build.clone(),
            variables: job.variables.clone(),
        }
    }

    /// Adds a variable exported to every step
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push((key.into(), value.into()));
        self
    }

    fn lines(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::PreBuild => &self.pre_build,
            Phase::Build => &self.build,
            Phase::PostBuild => &self.post_build,
        }
    }

    fn render(&self, phase: Phase, context: &BuildContext) -> StepDescriptor {
        let mut script = String::from("set -e\n");
        for line in self.lines(phase) {
            script.push_str(line);
            script.push('\n');
        }

        let mut step = StepDescriptor::new(phase, script)
            .with_env("BUILD_JOB_ID", context.job_id.to_string())
            .with_env("BUILD_PHASE", phase.to_string());
        for (key, value) in &self.variables {
            step = step.with_env(key.clone(), value.clone());
        }
        step
    }
}

impl StepProvider for ScriptStepProvider {
    fn pre_build(&self, context: &BuildContext) -> Result<StepDescriptor, BuildError> {
        Ok(self.render(Phase::PreBuild, context))
    }

    fn build(&self, context: &BuildContext) -> Result<StepDescriptor, BuildError> {
        if self.build.iter().all(|line| line.trim().is_empty()) {
            return Err(BuildError::Setup {
                phase: Phase::Build,
                reason: "job defines no script lines".to_string(),
            });
        }
        Ok(self.render(Phase::Build, context))
    }

    fn post_build(&self, context: &BuildContext) -> Result<StepDescriptor, BuildError> {
        Ok(self.render(Phase::PostBuild, context))
    }
}
