//! Turn orchestration primitives: lifecycle events and the turn state machine.

pub mod event;
pub mod state;

pub use event::{ChatPayload, CompleteData, Stage2Metadata, TitleData, TurnEvent};
pub use state::{PipelineKind, TurnMode, TurnState, TurnStateMachine};
