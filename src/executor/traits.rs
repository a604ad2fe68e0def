//! Step execution traits
//!
//! This module defines the seam between the build pipeline and the place
//! steps actually run.

use async_trait::async_trait;

use crate::pipeline::{AbortSignal, BuildResult, ImageKind, StepDescriptor};

/// Executes step descriptors somewhere
///
/// Implementations must watch `abort` themselves and release whatever they
/// hold (child processes, remote sessions) before returning
/// [`BuildError::Cancelled`](crate::pipeline::BuildError::Cancelled).
#[allow(clippy::missing_errors_doc)]
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Runs `step` with `image` to completion or until `abort` fires
    async fn run(&self, step: &StepDescriptor, image: ImageKind, abort: &AbortSignal) -> BuildResult;
}
