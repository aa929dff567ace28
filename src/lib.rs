//! chatwire — bridge a token-streaming chat-completion API to line- and
//! byte-limited chat protocols.
//!
//! The crate owns the streaming response pipeline: a protocol-aware
//! [`pipeline::Chunker`], a per-turn stream event processor with a
//! tool-continuation loop, and a per-conversation request lock. The model
//! client, concrete tools, and the protocol connection are supplied by the
//! embedding application through the [`client::ModelClient`],
//! [`tools::Tool`], and [`sink::OutputSink`] seams.

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod session;
pub mod sink;
pub mod tools;
pub mod types;

pub use error::{ChatwireError, Result};
