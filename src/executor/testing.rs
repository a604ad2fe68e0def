//! Scriptable runner used by pipeline and plugin tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;

use super::traits::StepRunner;
use crate::pipeline::{AbortSignal, BuildError, BuildResult, ImageKind, Phase, StepDescriptor};

/// One step the runner was asked to execute
#[derive(Debug, Clone)]
pub struct RecordedStep {
    pub phase: Phase,
    pub image: ImageKind,
    pub env: Vec<(String, String)>,
}

impl RecordedStep {
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type FailWhen = Box<dyn Fn(&StepDescriptor, ImageKind) -> bool + Send + Sync>;

/// Records every step and succeeds unless told otherwise
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<RecordedStep>>,
    finished: AtomicUsize,
    fail_when: Option<FailWhen>,
    barrier: Option<Arc<Barrier>>,
    work: Option<Duration>,
    hang: bool,
    deaf: bool,
    panic: bool,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails steps run with `image`
    pub fn failing_on(self, image: ImageKind) -> Self {
        self.failing_when(move |_, i| i == image)
    }

    pub fn failing_when(
        mut self,
        predicate: impl Fn(&StepDescriptor, ImageKind) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Every step waits for `parties` steps to be running at once
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Successful steps take `duration` unless aborted first
    pub fn with_work(mut self, duration: Duration) -> Self {
        self.work = Some(duration);
        self
    }

    /// Steps only end when aborted
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Work runs to completion even when aborted
    pub fn ignoring_abort(mut self) -> Self {
        self.deaf = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedStep> {
        self.calls.lock().clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.calls().iter().map(|c| c.phase).collect()
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    async fn perform(&self, step: &StepDescriptor, image: ImageKind, abort: &AbortSignal) -> BuildResult {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        assert!(!self.panic, "runner told to panic");

        if self.fail_when.as_ref().is_some_and(|f| f(step, image)) {
            let unit = step
                .env
                .iter()
                .find(|(k, _)| k == "BUILD_NODE_INDEX")
                .map_or_else(String::new, |(_, v)| format!(" (unit {v})"));
            return Err(BuildError::StepFailed {
                image,
                code: Some(1),
                message: format!("{} step failed{unit}", step.phase),
            });
        }

        if self.hang {
            abort.aborted().await;
            return Err(BuildError::Cancelled);
        }
        if let Some(work) = self.work {
            if self.deaf {
                tokio::time::sleep(work).await;
                return Ok(());
            }
            tokio::select! {
                () = tokio::time::sleep(work) => {}
                () = abort.aborted() => return Err(BuildError::Cancelled),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StepRunner for RecordingRunner {
    fn name(&self) -> &str {
        "recording"
    }

    async fn run(&self, step: &StepDescriptor, image: ImageKind, abort: &AbortSignal) -> BuildResult {
        self.calls.lock().push(RecordedStep {
            phase: step.phase,
            image,
            env: step.env.clone(),
        });
        let result = self.perform(step, image, abort).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        result
    }
}
