//! The streaming response pipeline.
//!
//! Turns an unbounded stream of model events into correctly-sized,
//! correctly-ordered protocol messages, executes tools triggered by that
//! stream, and serializes concurrent requests per conversation.

pub mod chunker;
pub mod dispatcher;
pub mod indicator;
pub mod lock;
pub mod processor;

pub use chunker::Chunker;
pub use dispatcher::{DispatchOutcome, Dispatcher, InboundMessage};
pub use indicator::{ThinkingIndicator, THINKING_INTERVAL};
pub use lock::{RequestLockGuard, RequestLockRegistry};
pub use processor::{PipelineOutcome, ACTION_TOOL_NAME};

#[cfg(test)]
mod tests;
