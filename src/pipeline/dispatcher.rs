//! Per-request orchestration: locking, session lookup, pipeline execution.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::{CompletionRequest, ModelClient};
use crate::config::Config;
use crate::session::{ConversationHistory, SessionStore};
use crate::sink::OutputSink;
use crate::tools::{ToolExecutionContext, ToolRegistry};
use crate::types::ChatMessage;

use super::lock::RequestLockRegistry;
use super::processor::{PipelineOutcome, TurnEngine};

/// An inbound protocol event that should produce a model response.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Conversation key: channel name, or the partner's nick for private
    /// messages.
    pub conversation: String,
    /// Nick of the sender.
    pub sender: String,
    /// Message text, already stripped of addressing prefixes.
    pub text: String,
    /// Whether this arrived as a private message.
    pub private: bool,
}

/// Terminal state of one dispatched request.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// All turns ran; the response (or a rendered error) was emitted.
    Completed,
    /// The conversation was already handling a request; a busy notice was
    /// sent and the pipeline never ran.
    Busy,
    /// The cancellation signal or request timeout fired mid-flight.
    Canceled,
    /// The pipeline failed; the failure was rendered to the user.
    Errored,
}

/// Routes inbound messages into the streaming pipeline, one at a time per
/// conversation key.
pub struct Dispatcher {
    config: Arc<Config>,
    client: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    sessions: SessionStore,
    locks: RequestLockRegistry,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>, client: Arc<dyn ModelClient>, registry: Arc<ToolRegistry>) -> Self {
        let sessions = SessionStore::new(
            config.bot.prompt.clone(),
            config.session.max_history,
            config.session.ttl(),
        );
        Self {
            config,
            client,
            registry,
            sessions,
            locks: RequestLockRegistry::new(),
        }
    }

    /// Handle one inbound message to completion, including every
    /// tool-continuation turn. The lock for the conversation key is held for
    /// the whole pipeline and released on every exit path.
    pub async fn dispatch(
        &self,
        inbound: InboundMessage,
        sink: &OutputSink,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let request_id = uuid::Uuid::new_v4();
        let key = inbound.conversation.clone();
        tracing::debug!(
            request_id = %request_id,
            conversation = %key,
            sender = %inbound.sender,
            "request_received"
        );

        // One token bounds lock wait, streaming, and tool execution alike.
        let deadline = self.config.api.timeout();
        let cancel = cancel.child_token();
        let deadline_task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(deadline).await;
                cancel.cancel();
            }
        });

        let outcome = self.dispatch_locked(inbound, sink, &cancel).await;

        deadline_task.abort();
        tracing::debug!(request_id = %request_id, conversation = %key, outcome = ?outcome, "request_finished");
        outcome
    }

    async fn dispatch_locked(
        &self,
        inbound: InboundMessage,
        sink: &OutputSink,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let Some(_guard) = self.locks.acquire(&inbound.conversation, cancel).await else {
            sink.message("busy with another request, try again shortly")
                .await;
            return DispatchOutcome::Busy;
        };

        let session = self.sessions.get(&inbound.conversation);
        tracing::info!(
            conversation = %inbound.conversation,
            message = %log_excerpt(&inbound.text),
            "message_received"
        );
        session.append(ChatMessage::user(&inbound.text));

        let request = CompletionRequest::builder()
            .model(self.config.model.model.clone())
            .messages(session.snapshot())
            .tools(self.registry.definitions())
            .maybe_max_tokens(self.config.model.max_tokens)
            .maybe_temperature(self.config.model.temperature)
            .maybe_top_p(self.config.model.top_p)
            .reasoning_effort(self.config.model.reasoning_effort)
            .stream(self.config.model.stream)
            .build();

        let tool_ctx = ToolExecutionContext {
            conversation: inbound.conversation.clone(),
            sender: Some(inbound.sender.clone()),
            private: inbound.private,
        };
        let engine = TurnEngine::new(
            self.config.clone(),
            self.client.clone(),
            self.registry.clone(),
            session,
            sink.clone(),
            tool_ctx,
        );

        match engine.run(request, cancel).await {
            PipelineOutcome::Completed => DispatchOutcome::Completed,
            PipelineOutcome::Errored => DispatchOutcome::Errored,
            PipelineOutcome::Canceled => DispatchOutcome::Canceled,
        }
    }

    /// Sessions held by this dispatcher (for stats surfaces).
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

// Inbound text is logged truncated; full content still reaches the model.
fn log_excerpt(text: &str) -> String {
    const MAX: usize = 100;
    if text.len() <= MAX {
        return text.to_string();
    }
    let mut cut = MAX;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}
