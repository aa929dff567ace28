//! Output queue toward the protocol client.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// One outbound unit for the protocol client to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A size-bounded chat message.
    Message(String),
    /// A side-channel notification ("thinking…", "calling weather").
    Action(String),
}

/// Clonable handle over the bounded outbound queue.
///
/// Sends are async: a full queue applies backpressure to the producer (the
/// stream-event reader), never dropping or reordering messages.
#[derive(Clone)]
pub struct OutputSink {
    tx: mpsc::Sender<Outbound>,
}

impl OutputSink {
    /// Create a sink with the given queue depth, returning the receiving end
    /// for the protocol client.
    pub fn new(depth: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }

    /// Create a sink whose receiving end is a `Stream`, for protocol clients
    /// that poll their write loop.
    pub fn into_stream(depth: usize) -> (Self, ReceiverStream<Outbound>) {
        let (sink, rx) = Self::new(depth);
        (sink, ReceiverStream::new(rx))
    }

    /// Queue a chat message. Returns false if the receiver is gone.
    pub async fn message(&self, text: impl Into<String>) -> bool {
        self.send(Outbound::Message(text.into())).await
    }

    /// Queue an action notification. Returns false if the receiver is gone.
    pub async fn action(&self, text: impl Into<String>) -> bool {
        self.send(Outbound::Action(text.into())).await
    }

    async fn send(&self, item: Outbound) -> bool {
        if self.tx.send(item).await.is_err() {
            tracing::warn!("output_sink_closed");
            return false;
        }
        true
    }
}
