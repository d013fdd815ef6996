//! Build run state machine and cancellation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Phase of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Idle,
    Planning,
    Dispatching,
    Emitting,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Planning => "planning",
            PipelineState::Dispatching => "dispatching",
            PipelineState::Emitting => "emitting",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    /// Whether a run is in progress.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            PipelineState::Planning | PipelineState::Dispatching | PipelineState::Emitting
        )
    }

    /// Whether `self -> to` is a legal transition. Finished runs may only
    /// start over when watching.
    pub fn can_advance(self, to: PipelineState, watch: bool) -> bool {
        use PipelineState::*;
        match (self, to) {
            (Idle, Planning) => true,
            (Planning, Dispatching) | (Dispatching, Emitting) | (Emitting, Done) => true,
            (Planning | Dispatching | Emitting, Failed) => true,
            (Done | Failed, Planning) => watch,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked holder of the current [`PipelineState`].
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: PipelineState,
    watch: bool,
}

impl Lifecycle {
    pub fn new(watch: bool) -> Self {
        Self {
            state: PipelineState::Idle,
            watch,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn advance(&mut self, to: PipelineState) -> Result<(), BuildError> {
        if !self.state.can_advance(to, self.watch) {
            return Err(BuildError::InvalidTransition { from: self.state, to });
        }
        tracing::trace!(from = %self.state, to = %to, "pipeline transition");
        self.state = to;
        Ok(())
    }

    /// Move a running pipeline to `Failed`. No-op when nothing is running.
    pub fn fail(&mut self) {
        if self.state.is_running() {
            self.state = PipelineState::Failed;
        }
    }
}

/// Shared cancellation flag, checked between phases and before each node
/// transform.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), BuildError> {
        if self.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn happy_path_transitions() {
        let mut lifecycle = Lifecycle::new(false);
        for next in [Planning, Dispatching, Emitting, Done] {
            lifecycle.advance(next).unwrap();
        }
        assert_eq!(lifecycle.state(), Done);
    }

    #[test]
    fn restart_requires_watch() {
        let mut once = Lifecycle::new(false);
        for next in [Planning, Dispatching, Emitting, Done] {
            once.advance(next).unwrap();
        }
        let err = once.advance(Planning).unwrap_err();
        assert_eq!(err.to_string(), "invalid pipeline transition from done to planning");

        let mut watching = Lifecycle::new(true);
        for next in [Planning, Failed, Planning, Dispatching, Emitting, Done, Planning] {
            watching.advance(next).unwrap();
        }
    }

    #[test]
    fn failure_is_reachable_from_running_phases_only() {
        for from in [Planning, Dispatching, Emitting] {
            assert!(from.can_advance(Failed, false));
        }
        assert!(!Idle.can_advance(Failed, true));
        assert!(!Done.can_advance(Failed, true));
        assert!(!Planning.can_advance(Emitting, true));
        assert!(!Idle.can_advance(Done, true));
    }

    #[test]
    fn fail_only_touches_running_pipelines() {
        let mut lifecycle = Lifecycle::new(false);
        lifecycle.fail();
        assert_eq!(lifecycle.state(), Idle);
        lifecycle.advance(Planning).unwrap();
        lifecycle.fail();
        assert_eq!(lifecycle.state(), Failed);
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(BuildError::Cancelled)));
    }
}
