//! The "run a step, honor abort" primitive every plugin goes through

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::traits::StepRunner;
use crate::pipeline::{AbortSignal, BuildError, BuildResult, ImageKind, StepDescriptor};

/// Runs `step` on `runner`, returning early when `abort` fires
///
/// The step runs on its own task. On abort this stops waiting at once and
/// returns `Cancelled`; the task is left running so the runner, which
/// observes the same signal, can release its resources in the background.
///
/// # Errors
///
/// Returns the runner's error, or [`BuildError::Cancelled`] on abort.
pub async fn run_step(
    runner: Arc<dyn StepRunner>,
    step: StepDescriptor,
    image: ImageKind,
    abort: &AbortSignal,
) -> BuildResult {
    let phase = step.phase;
    if abort.is_aborted() {
        debug!(phase = %phase, image = %image, "Skipping step, build aborted");
        return Err(BuildError::Cancelled);
    }

    info!(runner = runner.name(), phase = %phase, image = %image, "Running step");
    let start = Instant::now();

    let signal = abort.clone();
    let task = tokio::spawn(async move { runner.run(&step, image, &signal).await });

    let result = tokio::select! {
        biased;
        joined = task => joined.unwrap_or_else(|e| {
            Err(BuildError::StepFailed {
                image,
                code: None,
                message: format!("step task failed: {e}"),
            })
        }),
        () = abort.aborted() => {
            warn!(phase = %phase, image = %image, "Abort requested, detaching step");
            Err(BuildError::Cancelled)
        }
    };

    let duration_ms = start.elapsed().as_millis();
    match &result {
        Ok(()) => info!(phase = %phase, image = %image, duration_ms, "Step succeeded"),
        Err(e) if e.is_cancelled() => warn!(phase = %phase, image = %image, duration_ms, "Step cancelled"),
        Err(e) => error!(phase = %phase, image = %image, duration_ms, error = %e, "Step failed"),
    }
    result
}
