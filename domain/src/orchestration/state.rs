//! Per-turn state machine.
//!
//! Council pipeline:
//! `IDLE → STAGE1_RUNNING → STAGE1_DONE → STAGE2_RUNNING → STAGE2_DONE →
//!  STAGE3_RUNNING → STAGE3_DONE → INDEXED → COMPLETE`
//!
//! Chat pipeline:
//! `IDLE → REWRITING → RETRIEVING → CHAT_RUNNING → CHAT_DONE → INDEXED →
//!  COMPLETE`
//!
//! `ERROR` is reachable from any non-terminal state and is terminal for
//! the turn. Transition legality is enforced here so the orchestrator
//! cannot emit out-of-order lifecycle events by construction.

use serde::{Deserialize, Serialize};

use crate::core::error::DomainError;

/// Which pipeline a turn runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Council,
    Chat,
}

/// Requested mode from the message surface.
///
/// `Auto` is the structural default: the first user message runs the
/// council pipeline, every later one runs the chat pipeline. The explicit
/// variants override that, e.g. a full-deliberation request mid-way
/// through a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnMode {
    #[default]
    Auto,
    Council,
    Chat,
}

impl TurnMode {
    /// Resolve the requested mode to a pipeline.
    pub fn resolve(&self, is_first_message: bool) -> PipelineKind {
        match self {
            TurnMode::Auto => {
                if is_first_message {
                    PipelineKind::Council
                } else {
                    PipelineKind::Chat
                }
            }
            TurnMode::Council => PipelineKind::Council,
            TurnMode::Chat => PipelineKind::Chat,
        }
    }
}

/// Lifecycle state of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    Idle,
    Stage1Running,
    Stage1Done,
    Stage2Running,
    Stage2Done,
    Stage3Running,
    Stage3Done,
    Rewriting,
    Retrieving,
    ChatRunning,
    ChatDone,
    Indexed,
    Complete,
    Error,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Complete | TurnState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Idle => "IDLE",
            TurnState::Stage1Running => "STAGE1_RUNNING",
            TurnState::Stage1Done => "STAGE1_DONE",
            TurnState::Stage2Running => "STAGE2_RUNNING",
            TurnState::Stage2Done => "STAGE2_DONE",
            TurnState::Stage3Running => "STAGE3_RUNNING",
            TurnState::Stage3Done => "STAGE3_DONE",
            TurnState::Rewriting => "REWRITING",
            TurnState::Retrieving => "RETRIEVING",
            TurnState::ChatRunning => "CHAT_RUNNING",
            TurnState::ChatDone => "CHAT_DONE",
            TurnState::Indexed => "INDEXED",
            TurnState::Complete => "COMPLETE",
            TurnState::Error => "ERROR",
        }
    }

    /// The successor state within a pipeline, if one exists.
    fn successor(&self, pipeline: PipelineKind) -> Option<TurnState> {
        use TurnState::*;
        match pipeline {
            PipelineKind::Council => match self {
                Idle => Some(Stage1Running),
                Stage1Running => Some(Stage1Done),
                Stage1Done => Some(Stage2Running),
                Stage2Running => Some(Stage2Done),
                Stage2Done => Some(Stage3Running),
                Stage3Running => Some(Stage3Done),
                Stage3Done => Some(Indexed),
                Indexed => Some(Complete),
                _ => None,
            },
            PipelineKind::Chat => match self {
                Idle => Some(Rewriting),
                Rewriting => Some(Retrieving),
                Retrieving => Some(ChatRunning),
                ChatRunning => Some(ChatDone),
                ChatDone => Some(Indexed),
                Indexed => Some(Complete),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks and enforces a single turn's state transitions.
#[derive(Debug, Clone)]
pub struct TurnStateMachine {
    pipeline: PipelineKind,
    state: TurnState,
}

impl TurnStateMachine {
    pub fn new(pipeline: PipelineKind) -> Self {
        Self {
            pipeline,
            state: TurnState::Idle,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn pipeline(&self) -> PipelineKind {
        self.pipeline
    }

    /// Advance to the given state, failing on an illegal transition.
    ///
    /// `ERROR` is legal from any non-terminal state.
    pub fn advance(&mut self, next: TurnState) -> Result<(), DomainError> {
        let legal = if next == TurnState::Error {
            !self.state.is_terminal()
        } else {
            self.state.successor(self.pipeline) == Some(next)
        };

        if !legal {
            return Err(DomainError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_resolution_is_structural_on_auto() {
        assert_eq!(TurnMode::Auto.resolve(true), PipelineKind::Council);
        assert_eq!(TurnMode::Auto.resolve(false), PipelineKind::Chat);
        // Explicit modes override position
        assert_eq!(TurnMode::Council.resolve(false), PipelineKind::Council);
        assert_eq!(TurnMode::Chat.resolve(true), PipelineKind::Chat);
    }

    #[test]
    fn test_council_happy_path() {
        let mut machine = TurnStateMachine::new(PipelineKind::Council);
        for state in [
            TurnState::Stage1Running,
            TurnState::Stage1Done,
            TurnState::Stage2Running,
            TurnState::Stage2Done,
            TurnState::Stage3Running,
            TurnState::Stage3Done,
            TurnState::Indexed,
            TurnState::Complete,
        ] {
            machine.advance(state).unwrap();
        }
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_chat_happy_path() {
        let mut machine = TurnStateMachine::new(PipelineKind::Chat);
        for state in [
            TurnState::Rewriting,
            TurnState::Retrieving,
            TurnState::ChatRunning,
            TurnState::ChatDone,
            TurnState::Indexed,
            TurnState::Complete,
        ] {
            machine.advance(state).unwrap();
        }
        assert_eq!(machine.state(), TurnState::Complete);
    }

    #[test]
    fn test_skipping_a_stage_is_illegal() {
        let mut machine = TurnStateMachine::new(PipelineKind::Council);
        machine.advance(TurnState::Stage1Running).unwrap();
        let err = machine.advance(TurnState::Stage2Running).unwrap_err();
        assert!(err.to_string().contains("STAGE1_RUNNING"));
    }

    #[test]
    fn test_chat_states_illegal_in_council_pipeline() {
        let mut machine = TurnStateMachine::new(PipelineKind::Council);
        assert!(machine.advance(TurnState::Rewriting).is_err());
    }

    #[test]
    fn test_error_reachable_from_any_running_state() {
        let mut machine = TurnStateMachine::new(PipelineKind::Council);
        machine.advance(TurnState::Stage1Running).unwrap();
        machine.advance(TurnState::Stage1Done).unwrap();
        machine.advance(TurnState::Error).unwrap();
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_error_is_terminal() {
        let mut machine = TurnStateMachine::new(PipelineKind::Chat);
        machine.advance(TurnState::Error).unwrap();
        assert!(machine.advance(TurnState::Rewriting).is_err());
        assert!(machine.advance(TurnState::Error).is_err());
    }

    #[test]
    fn test_complete_is_terminal() {
        let mut machine = TurnStateMachine::new(PipelineKind::Chat);
        for state in [
            TurnState::Rewriting,
            TurnState::Retrieving,
            TurnState::ChatRunning,
            TurnState::ChatDone,
            TurnState::Indexed,
            TurnState::Complete,
        ] {
            machine.advance(state).unwrap();
        }
        assert!(machine.advance(TurnState::Error).is_err());
    }
}
