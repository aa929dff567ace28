//! Stream event processing and the tool-continuation loop.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::{CompletionRequest, EventStream, ModelClient};
use crate::config::Config;
use crate::session::ConversationHistory;
use crate::sink::OutputSink;
use crate::tools::{ToolArguments, ToolExecutionContext, ToolRegistry};
use crate::types::{ChatMessage, StreamEvent, ToolCall};

use super::indicator::{ThinkingIndicator, THINKING_INTERVAL};

/// Tool that posts a raw action itself; no "calling …" notification for it,
/// to avoid notifying about the notification.
pub const ACTION_TOOL_NAME: &str = "chat_action";

/// Result of draining one model turn's event stream.
#[derive(Debug)]
pub(crate) enum TurnOutcome {
    /// The stream ended with a complete message (appended to history).
    Completed(ChatMessage),
    /// The stream reported an error; it was rendered to the user.
    Errored,
    /// The cancellation signal fired; the partial message was discarded.
    Canceled,
    /// The stream violated its contract (ended without a terminal event).
    Failed(String),
}

/// Consumes one ordered event stream for a single model turn and drives its
/// side effects: chunked emission, thinking notifications, history append.
///
/// One instance per turn; continuation turns get a fresh processor.
pub(crate) struct StreamEventProcessor {
    config: Arc<Config>,
    sink: OutputSink,
    history: Arc<dyn ConversationHistory>,
    chunker: super::chunker::Chunker,
    indicator: ThinkingIndicator,
}

impl StreamEventProcessor {
    pub(crate) fn new(
        config: Arc<Config>,
        sink: OutputSink,
        history: Arc<dyn ConversationHistory>,
    ) -> Self {
        let chunker = super::chunker::Chunker::new(config.session.chunk_max);
        Self {
            config,
            sink,
            history,
            chunker,
            indicator: ThinkingIndicator::new(),
        }
    }

    /// Drain the stream, reacting to each event in order.
    pub(crate) async fn process(
        mut self,
        mut events: EventStream,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("stream_canceled");
                    return TurnOutcome::Canceled;
                }
                event = events.next() => event,
            };
            let Some(event) = event else {
                return TurnOutcome::Failed("stream ended without a terminal event".to_string());
            };
            match event {
                StreamEvent::Reasoning { text } => self.on_reasoning(&text),
                StreamEvent::Content { text, first } => self.on_content(&text, first).await,
                StreamEvent::ToolCall(call) => self.on_tool_call(&call),
                StreamEvent::Complete(message) => return self.on_complete(message).await,
                StreamEvent::Error { message } => {
                    self.on_error(&message).await;
                    return TurnOutcome::Errored;
                }
            }
        }
    }

    fn on_reasoning(&mut self, text: &str) {
        if self.config.bot.show_thinking_action && !self.indicator.is_running() {
            self.indicator.start(self.sink.clone(), THINKING_INTERVAL);
        }
        tracing::debug!(len = text.len(), "reasoning_update");
    }

    async fn on_content(&mut self, text: &str, first: bool) {
        self.indicator.stop();
        tracing::debug!(len = text.len(), first, "content_chunk");
        for chunk in self.chunker.write(text) {
            self.sink.message(chunk).await;
        }
    }

    // Tool calls act only once the full turn is known, from the Complete
    // message; argument payloads may still be partial here.
    fn on_tool_call(&self, call: &ToolCall) {
        tracing::debug!(tool = %call.name, id = %call.id, "tool_call_streamed");
    }

    async fn on_complete(&mut self, message: ChatMessage) -> TurnOutcome {
        self.indicator.stop();
        tracing::debug!(
            role = %message.role,
            content_len = message.content.len(),
            tool_calls = message.tool_calls.len(),
            "message_complete"
        );
        self.history.append(message.clone());
        if !message.content.is_empty() && message.tool_calls.is_empty() {
            if let Some(rest) = self.chunker.flush() {
                self.sink.message(rest).await;
            }
        }
        TurnOutcome::Completed(message)
    }

    async fn on_error(&mut self, message: &str) {
        self.indicator.stop();
        tracing::debug!(error = %message, "stream_error");
        // The failure goes out through the same bounded-chunk path as content.
        for chunk in self.chunker.write(&format!("Error: {message}")) {
            self.sink.message(chunk).await;
        }
        if let Some(rest) = self.chunker.flush() {
            self.sink.message(rest).await;
        }
    }
}

/// Runs a request to completion: streams the first turn, executes any tool
/// calls, re-issues the request with the updated history, and repeats until a
/// turn finishes with no tool calls or the turn cap is hit.
pub(crate) struct TurnEngine {
    config: Arc<Config>,
    client: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    history: Arc<dyn ConversationHistory>,
    sink: OutputSink,
    tool_ctx: ToolExecutionContext,
}

/// Terminal state of a whole request (all continuation turns included).
#[derive(Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    Errored,
    Canceled,
}

impl TurnEngine {
    pub(crate) fn new(
        config: Arc<Config>,
        client: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        history: Arc<dyn ConversationHistory>,
        sink: OutputSink,
        tool_ctx: ToolExecutionContext,
    ) -> Self {
        Self {
            config,
            client,
            registry,
            history,
            sink,
            tool_ctx,
        }
    }

    pub(crate) async fn run(
        &self,
        mut request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> PipelineOutcome {
        // Continuations must re-issue under the name the caller configured,
        // even if the client rewrites it for routing.
        let original_model = request.model.clone();
        let max_turns = self.config.api.max_turns.max(1);
        let mut turn = 0usize;

        loop {
            turn += 1;
            if turn > max_turns {
                tracing::warn!(max_turns, "continuation_turn_cap_reached");
                self.emit_error_text(&format!(
                    "tool loop exceeded {max_turns} turns, giving up"
                ))
                .await;
                return PipelineOutcome::Errored;
            }

            let events = match self.client.stream_turn(&request).await {
                Ok(events) => events,
                Err(err) => {
                    self.emit_error_text(&err.to_string()).await;
                    return PipelineOutcome::Errored;
                }
            };

            let processor = StreamEventProcessor::new(
                self.config.clone(),
                self.sink.clone(),
                self.history.clone(),
            );
            let message = match processor.process(events, cancel).await {
                TurnOutcome::Completed(message) => message,
                TurnOutcome::Errored => return PipelineOutcome::Errored,
                TurnOutcome::Canceled => return PipelineOutcome::Canceled,
                TurnOutcome::Failed(reason) => {
                    self.emit_error_text(&reason).await;
                    return PipelineOutcome::Errored;
                }
            };

            if message.tool_calls.is_empty() {
                return PipelineOutcome::Completed;
            }

            if self.execute_tool_calls(&message.tool_calls, cancel).await.is_none() {
                return PipelineOutcome::Canceled;
            }

            request.messages = self.history.snapshot();
            request.model = original_model.clone();
            tracing::debug!(turn, "continuation_reissued");
        }
    }

    /// Execute every call from a completed turn, in model order, appending a
    /// tool-role message for each. A failing call never aborts its siblings.
    /// Returns `None` if cancelled between or during calls.
    async fn execute_tool_calls(
        &self,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Option<()> {
        for call in calls {
            if cancel.is_cancelled() {
                return None;
            }

            let args = match ToolArguments::from_raw(&call.arguments) {
                Ok(args) => args,
                Err(err) => {
                    tracing::error!(tool = %call.name, error = %err, "tool_arguments_invalid");
                    self.history.append(ChatMessage::tool_result(
                        &call.id,
                        format!("Error parsing arguments: {err}"),
                    ));
                    continue;
                }
            };

            let Some(tool) = self.registry.resolve(&call.name) else {
                tracing::warn!(tool = %call.name, "tool_not_found");
                self.history.append(ChatMessage::tool_result(
                    &call.id,
                    format!("Tool not found: {}", call.name),
                ));
                continue;
            };

            if self.config.bot.show_tool_actions && call.name != ACTION_TOOL_NAME {
                self.sink
                    .action(format!("calling {}", display_name(&call.name)))
                    .await;
            }

            tracing::info!(tool = %call.name, id = %call.id, "tool_executing");
            let started = Instant::now();
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(tool = %call.name, "tool_canceled");
                    return None;
                }
                result = tool.execute(&args, &self.tool_ctx) => result,
            };
            let duration = started.elapsed();

            let content = match result {
                Ok(output) => {
                    let preview = if self.config.bot.verbose {
                        output.as_str()
                    } else {
                        truncate_preview(&output, 200)
                    };
                    tracing::info!(
                        tool = %call.name,
                        duration_ms = duration.as_millis() as u64,
                        result_size = output.len(),
                        preview = %preview,
                        "tool_completed"
                    );
                    output
                }
                Err(err) => {
                    tracing::error!(
                        tool = %call.name,
                        duration_ms = duration.as_millis() as u64,
                        error = %err,
                        "tool_failed"
                    );
                    format!("Error: {err}")
                }
            };

            self.history.append(ChatMessage::tool_result(&call.id, content));
        }
        Some(())
    }

    async fn emit_error_text(&self, message: &str) {
        let mut chunker = super::chunker::Chunker::new(self.config.session.chunk_max);
        for chunk in chunker.write(&format!("Error: {message}")) {
            self.sink.message(chunk).await;
        }
        if let Some(rest) = chunker.flush() {
            self.sink.message(rest).await;
        }
    }
}

/// Strip a loader namespace prefix for user-facing display
/// (`script__weather` → `weather`).
fn display_name(tool: &str) -> &str {
    match tool.find("__") {
        Some(idx) => &tool[idx + 2..],
        None => tool,
    }
}

// Log previews cut at a char boundary at or below `max` bytes.
fn truncate_preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut cut = max;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}
