//! Turn event logging port
//!
//! Every lifecycle event emitted to the stream is also handed to the
//! logger. Logging is best-effort: implementations must never fail the
//! turn.

use council_domain::{ConversationId, TurnEvent};

/// Sink for emitted lifecycle events
pub trait TurnLogger: Send + Sync {
    fn log(&self, conversation: &ConversationId, event: &TurnEvent);
}

/// No-op logger for when event logging is not configured
pub struct NoTurnLogger;

impl TurnLogger for NoTurnLogger {
    fn log(&self, _conversation: &ConversationId, _event: &TurnEvent) {}
}
