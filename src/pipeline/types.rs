//! Core types for build domain
//!
//! This module contains the phase, image and state enums that describe
//! where a build job currently is.

#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named stage of job execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Workspace preparation
    PreBuild,
    /// The job's own commands
    Build,
    /// Artifact collection and teardown
    PostBuild,
}

impl Phase {
    /// Image a step of this phase runs with when executed by the full pipeline
    pub fn image(self) -> ImageKind {
        match self {
            Self::PreBuild => ImageKind::PreBuild,
            Self::Build => ImageKind::Default,
            Self::PostBuild => ImageKind::PostBuild,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreBuild => write!(f, "pre-build"),
            Self::Build => write!(f, "build"),
            Self::PostBuild => write!(f, "post-build"),
        }
    }
}

/// Execution environment tag a step is run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageKind {
    /// Image used for workspace preparation
    PreBuild,
    /// Image the job's commands run in
    Default,
    /// Image used for artifact collection
    PostBuild,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreBuild => write!(f, "pre-build image"),
            Self::Default => write!(f, "default image"),
            Self::PostBuild => write!(f, "post-build image"),
        }
    }
}

/// Where a pipeline run currently is
///
/// Transitions are strictly forward: `Init -> PreBuild -> PluginBody ->
/// PostBuild -> Done`, and any state may move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildState {
    /// Nothing ran yet
    Init,
    /// Running the pre-build step
    PreBuild,
    /// Running the selected plugin
    PluginBody,
    /// Running the post-build step
    PostBuild,
    /// Every phase succeeded
    Done,
    /// A phase failed or was cancelled
    Failed,
}

impl BuildState {
    /// Returns true once the run can make no further progress
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Init => 0,
            Self::PreBuild => 1,
            Self::PluginBody => 2,
            Self::PostBuild => 3,
            Self::Done => 4,
            Self::Failed => 5,
        }
    }

    /// Returns true if moving from `self` to `next` is allowed
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Failed || next.rank() == self.rank() + 1
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::PreBuild => write!(f, "PRE_BUILD"),
            Self::PluginBody => write!(f, "PLUGIN_BODY"),
            Self::PostBuild => write!(f, "POST_BUILD"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_images() {
        assert_eq!(Phase::PreBuild.image(), ImageKind::PreBuild);
        assert_eq!(Phase::Build.image(), ImageKind::Default);
        assert_eq!(Phase::PostBuild.image(), ImageKind::PostBuild);
    }

    #[test]
    fn test_state_forward_only() {
        assert!(BuildState::Init.can_transition_to(BuildState::PreBuild));
        assert!(BuildState::PreBuild.can_transition_to(BuildState::PluginBody));
        assert!(BuildState::PostBuild.can_transition_to(BuildState::Done));
        assert!(!BuildState::Init.can_transition_to(BuildState::PluginBody));
        assert!(!BuildState::PluginBody.can_transition_to(BuildState::PreBuild));
    }

    #[test]
    fn test_failed_reachable_and_absorbing() {
        for state in [
            BuildState::Init,
            BuildState::PreBuild,
            BuildState::PluginBody,
            BuildState::PostBuild,
        ] {
            assert!(state.can_transition_to(BuildState::Failed));
        }
        assert!(!BuildState::Failed.can_transition_to(BuildState::Done));
        assert!(!BuildState::Done.can_transition_to(BuildState::Failed));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Phase::PostBuild).unwrap();
        assert_eq!(json, r#""post-build""#);
        let image: ImageKind = serde_json::from_str(r#""pre-build""#).unwrap();
        assert_eq!(image, ImageKind::PreBuild);
    }
}
