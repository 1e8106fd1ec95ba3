//! Seam to the chat transport. The core does not define a wire format;
//! it hands the transport a turn to run and consumes lifecycle events in
//! arrival order.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use drawbridge_tools::ToolSchema;

use crate::conversation::Message;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chat transport failed: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Context sent alongside a turn but never rendered as a conversation part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideChannel {
    pub diagram_xml: String,
}

/// Everything the transport needs to run one agent turn.
#[derive(Debug, Clone)]
pub struct OutgoingTurn {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub side_channel: SideChannel,
}

/// Lifecycle events for one turn, delivered in stream order.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// Streamed assistant text.
    TextDelta { text: String },
    /// A tool call appeared; its input is still streaming.
    ToolCallStarted { id: String, name: String },
    /// A tool call's input is complete and it may execute.
    ToolCallReady {
        id: String,
        name: String,
        input: Value,
    },
    /// The turn settled; no further events follow.
    Completed,
    /// The stream failed; no further events follow.
    Failed { error: TransportError },
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Start an agent turn. Events arrive on the returned channel until a
    /// `Completed` or `Failed` event closes the turn.
    async fn start_turn(
        &self,
        turn: OutgoingTurn,
    ) -> Result<mpsc::Receiver<TurnEvent>, TransportError>;
}
