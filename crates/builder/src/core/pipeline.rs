//! Pipeline state machine
//!
//! An invocation moves strictly forward through the states below. Any
//! failure moves it to `Failed`, which is terminal.

use kiln_errors::Error;
use kiln_events::BuildPhase;
use serde::Serialize;
use std::fmt;

/// Where an invocation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Validated,
    SourceReady,
    Configured,
    Built,
    Packaged,
    Exported,
    Failed { at: BuildPhase },
}

impl PipelineState {
    /// The only state this one may advance to
    #[must_use]
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Validated),
            Self::Validated => Some(Self::SourceReady),
            Self::SourceReady => Some(Self::Configured),
            Self::Configured => Some(Self::Built),
            Self::Built => Some(Self::Packaged),
            Self::Packaged => Some(Self::Exported),
            Self::Exported | Self::Failed { .. } => None,
        }
    }

    /// Phase whose success reaches this state
    #[must_use]
    pub fn reached_by(self) -> Option<BuildPhase> {
        match self {
            Self::Validated => Some(BuildPhase::Validate),
            Self::SourceReady => Some(BuildPhase::Source),
            Self::Configured => Some(BuildPhase::Configure),
            Self::Built => Some(BuildPhase::Build),
            Self::Packaged => Some(BuildPhase::Package),
            Self::Exported => Some(BuildPhase::Export),
            Self::Init | Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exported | Self::Failed { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Validated => f.write_str("validated"),
            Self::SourceReady => f.write_str("source_ready"),
            Self::Configured => f.write_str("configured"),
            Self::Built => f.write_str("built"),
            Self::Packaged => f.write_str("packaged"),
            Self::Exported => f.write_str("exported"),
            Self::Failed { at } => write!(f, "failed at {}", at.as_str()),
        }
    }
}

/// Tracks the state of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    state: PipelineState,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PipelineState::Init,
        }
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Move to `next`, which must be the current state's successor
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` for any other transition.
    pub fn advance(&mut self, next: PipelineState) -> Result<(), Error> {
        if self.state.successor() != Some(next) {
            return Err(Error::internal(format!(
                "invalid pipeline transition from {} to {next}",
                self.state
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Record a failure in `phase`; a terminal state is kept
    pub fn fail(&mut self, phase: BuildPhase) {
        if !self.state.is_terminal() {
            self.state = PipelineState::Failed { at: phase };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_run() {
        let mut pipeline = Pipeline::new();
        let order = [
            PipelineState::Validated,
            PipelineState::SourceReady,
            PipelineState::Configured,
            PipelineState::Built,
            PipelineState::Packaged,
            PipelineState::Exported,
        ];
        for state in order {
            pipeline.advance(state).unwrap();
        }
        assert_eq!(pipeline.state(), PipelineState::Exported);
        assert!(pipeline.state().is_terminal());
    }

    #[test]
    fn test_skipping_a_state_is_rejected() {
        let mut pipeline = Pipeline::new();
        assert!(pipeline.advance(PipelineState::Configured).is_err());
        assert_eq!(pipeline.state(), PipelineState::Init);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut pipeline = Pipeline::new();
        pipeline.advance(PipelineState::Validated).unwrap();
        pipeline.fail(BuildPhase::Source);
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed {
                at: BuildPhase::Source
            }
        );

        pipeline.fail(BuildPhase::Build);
        assert_eq!(pipeline.state().to_string(), "failed at source");
        assert!(pipeline.advance(PipelineState::SourceReady).is_err());
    }

    #[test]
    fn test_reached_by() {
        assert_eq!(PipelineState::Built.reached_by(), Some(BuildPhase::Build));
        assert_eq!(PipelineState::Init.reached_by(), None);
    }
}
