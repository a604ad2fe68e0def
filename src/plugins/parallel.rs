//! Fan-out of the build step
//!
//! The `parallel` plugin runs the build step on `steps` concurrent units.
//! Each unit sees its 1-based index and the unit count in its environment.
//! The first failing unit aborts its siblings, and every unit is awaited
//! before that failure is returned. An abort from outside stops the wait
//! at once; the units observe the same signal and wind down on their own.

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::Plugin;
use crate::pipeline::{AbortSignal, BuildContext, BuildError, BuildOptions, BuildResult, ImageKind};

/// Option holding the number of units
pub const STEPS_OPTION: &str = "steps";
/// Largest accepted number of units
pub const MAX_UNITS: usize = 256;
/// Environment variable carrying a unit's 1-based index
pub const NODE_INDEX_VAR: &str = "BUILD_NODE_INDEX";
/// Environment variable carrying the unit count
pub const NODE_TOTAL_VAR: &str = "BUILD_NODE_TOTAL";

/// Runs the build step on several units at once
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelPlugin;

fn degree(options: &BuildOptions) -> Result<usize, BuildError> {
    match options.require::<usize>(STEPS_OPTION)? {
        0 => Err(BuildError::Config(format!(
            "option '{STEPS_OPTION}' must be at least 1"
        ))),
        n if n > MAX_UNITS => Err(BuildError::Config(format!(
            "option '{STEPS_OPTION}' = {n} exceeds the limit of {MAX_UNITS} units"
        ))),
        n => Ok(n),
    }
}

#[async_trait]
impl Plugin for ParallelPlugin {
    fn description(&self) -> &str {
        "Run the build step on `steps` concurrent units"
    }

    async fn run(
        &self,
        context: &mut BuildContext,
        options: &BuildOptions,
        abort: &AbortSignal,
    ) -> BuildResult {
        let total = degree(options)?;
        let step = context.provider().build(context)?;
        if abort.is_aborted() {
            return Err(BuildError::Cancelled);
        }
        let (siblings, unit_signal) = abort.child();

        info!(job_id = %context.job_id, units = total, "Starting parallel build");

        let mut units = JoinSet::new();
        for index in 1..=total {
            let runner = context.runner();
            let signal = unit_signal.clone();
            let step = step
                .clone()
                .with_env(NODE_INDEX_VAR, index.to_string())
                .with_env(NODE_TOTAL_VAR, total.to_string());
            units.spawn(async move {
                debug!(unit = index, runner = runner.name(), "Unit started");
                let result = runner.run(&step, ImageKind::Default, &signal).await;
                (index, result)
            });
        }

        let mut failure: Option<BuildError> = None;
        let mut cancelled = false;
        loop {
            let joined = tokio::select! {
                biased;
                joined = units.join_next() => match joined {
                    Some(joined) => joined,
                    None => break,
                },
                () = abort.aborted() => {
                    warn!(job_id = %context.job_id, running = units.len(), "Abort requested, detaching units");
                    siblings.abort();
                    units.detach_all();
                    return Err(failure.unwrap_or(BuildError::Cancelled));
                }
            };
            let (index, result) = joined.unwrap_or_else(|e| {
                (
                    0,
                    Err(BuildError::StepFailed {
                        image: ImageKind::Default,
                        code: None,
                        message: format!("unit task failed: {e}"),
                    }),
                )
            });
            match result {
                Ok(()) => debug!(unit = index, "Unit succeeded"),
                Err(BuildError::Cancelled) => cancelled = true,
                Err(e) => {
                    if failure.is_none() {
                        warn!(unit = index, error = %e, "Unit failed, aborting siblings");
                        siblings.abort();
                        failure = Some(e);
                    }
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None if cancelled => Err(BuildError::Cancelled),
            None => {
                info!(job_id = %context.job_id, units = total, "All units succeeded");
                Ok(())
            }
        }
    }
}
