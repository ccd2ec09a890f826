//! Typed event channel for streaming turns.
//!
//! All lifecycle events for a turn flow through one [`EventSender`] owned
//! by the single orchestrating task, which makes the ordering guarantees
//! structural: events are emitted in the order the pipeline awaits them.
//!
//! Delivery is fire-and-forget. A disconnected subscriber stops event
//! delivery but never aborts in-flight model calls or turn persistence.

use std::sync::Arc;

use council_domain::{ConversationId, TurnEvent};
use tokio::sync::mpsc;
use tracing::debug;

use crate::ports::turn_logger::TurnLogger;

/// Sending half of a turn's event stream.
pub struct EventSender {
    conversation: ConversationId,
    tx: mpsc::UnboundedSender<TurnEvent>,
    logger: Arc<dyn TurnLogger>,
}

impl EventSender {
    /// Create a sender/receiver pair for one turn.
    pub fn channel(
        conversation: ConversationId,
        logger: Arc<dyn TurnLogger>,
    ) -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                conversation,
                tx,
                logger,
            },
            rx,
        )
    }

    /// Emit an event: log it, then deliver it if the subscriber is still
    /// connected.
    pub fn emit(&self, event: TurnEvent) {
        self.logger.log(&self.conversation, &event);

        if self.tx.send(event).is_err() {
            debug!(
                conversation = %self.conversation,
                "subscriber disconnected; turn continues without delivery"
            );
        }
    }
}
