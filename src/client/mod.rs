//! Model client interface.
//!
//! The streaming pipeline consumes a model through this seam. Concrete
//! clients (provider routing, authentication, HTTP transport) live outside
//! this crate.

use async_trait::async_trait;
use bon::Builder;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Result;
use crate::types::{ChatMessage, StreamEvent};

/// Ordered event sequence for one model turn.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// A chat-completion request.
#[derive(Debug, Clone, Builder)]
pub struct CompletionRequest {
    #[builder(into)]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[builder(default)]
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// `Some(false)` requests a non-streaming completion; clients adapt the
    /// result with [`message_event_stream`].
    pub stream: Option<bool>,
}

/// Tool made available to the model for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments.
    pub parameters: serde_json::Value,
}

/// Reasoning effort level for reasoning models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

/// Client for a streaming chat-completion API.
///
/// Implementations must deliver reasoning/content/tool-call events in provider
/// order and end every stream with exactly one `Complete` or `Error` event.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn stream_turn(&self, request: &CompletionRequest) -> Result<EventStream>;
}

/// Adapt a fully assembled completion into the streaming event sequence.
///
/// Used by clients running in non-streaming mode so the rest of the pipeline
/// sees a single code path.
pub fn message_event_stream(message: ChatMessage) -> EventStream {
    let stream = async_stream::stream! {
        if !message.content.is_empty() {
            yield StreamEvent::Content {
                text: message.content.clone(),
                first: true,
            };
        }
        yield StreamEvent::Complete(message);
    };
    Box::pin(stream)
}
