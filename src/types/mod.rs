//! Core data types.

pub mod message;
pub mod stream;

pub use message::{ChatMessage, Role, ToolCall};
pub use stream::StreamEvent;
