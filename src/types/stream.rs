//! Streaming event types.

use serde::{Deserialize, Serialize};

use super::message::{ChatMessage, ToolCall};

/// One unit from a model's event stream.
///
/// Exactly one terminal event (`Complete` or `Error`) ends every stream; the
/// model client is responsible for upholding that contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental "thinking" text. Informational only, never shown to users.
    Reasoning { text: String },
    /// Incremental answer text.
    Content { text: String, first: bool },
    /// One assistant-requested tool invocation. Arguments may still be
    /// partial; execution waits for the `Complete` message.
    ToolCall(ToolCall),
    /// Terminal: the fully assembled message for the turn.
    Complete(ChatMessage),
    /// Terminal: the stream failed.
    Error { message: String },
}

impl StreamEvent {
    /// Whether this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error { .. })
    }
}
