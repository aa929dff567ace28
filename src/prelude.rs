//! Convenience re-exports for common use.

pub use crate::client::{CompletionRequest, EventStream, ModelClient, ReasoningEffort, ToolDefinition};
pub use crate::config::Config;
pub use crate::error::{ChatwireError, Result};
pub use crate::pipeline::{DispatchOutcome, Dispatcher, InboundMessage};
pub use crate::session::{ConversationHistory, Session, SessionStore};
pub use crate::sink::{Outbound, OutputSink};
pub use crate::tools::{FunctionTool, Tool, ToolArguments, ToolExecutionContext, ToolRegistry};
pub use crate::types::{ChatMessage, Role, StreamEvent, ToolCall};
