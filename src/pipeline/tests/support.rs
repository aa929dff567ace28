use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::client::{CompletionRequest, EventStream, ModelClient};
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::processor::TurnEngine;
use crate::session::{ConversationHistory, Session};
use crate::sink::{Outbound, OutputSink};
use crate::tools::{FunctionTool, Tool, ToolExecutionContext, ToolRegistry};
use crate::types::{ChatMessage, StreamEvent, ToolCall};

#[derive(Clone, Copy)]
pub(super) enum ClientScenario {
    /// Content("Hello") then Complete.
    ContentThenComplete,
    /// Two content events forming two newline-terminated lines.
    MultiLineContent,
    /// Reasoning, a 20s pause, then content.
    SlowReasoningThenContent,
    /// Terminal Error with an oversized message.
    StreamError,
    /// Stream ends without any terminal event.
    NoTerminal,
    /// One content line, then the stream never ends.
    HangAfterContent,
    /// Call 0: one "script__weather" tool call; call 1+: a text turn.
    ToolCallThenText,
    /// Call 0: malformed-args, unknown, and valid calls; call 1+: text.
    ToolBatchThenText,
    /// Call 0: a call to the action tool; call 1+: text.
    ActionToolThenText,
    /// Every call is another tool-call turn.
    EndlessToolCalls,
}

pub(super) struct StubClient {
    scenario: ClientScenario,
    calls: AtomicUsize,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl StubClient {
    pub(super) fn new(scenario: ClientScenario) -> (Self, Arc<Mutex<Vec<CompletionRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                scenario,
                calls: AtomicUsize::new(0),
                requests: requests.clone(),
            },
            requests,
        )
    }
}

#[async_trait]
impl ModelClient for StubClient {
    async fn stream_turn(&self, request: &CompletionRequest) -> Result<EventStream> {
        self.requests.lock().expect("request log").push(request.clone());
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(events_for_scenario(self.scenario, call_index))
    }
}

fn content(text: &str, first: bool) -> StreamEvent {
    StreamEvent::Content {
        text: text.to_string(),
        first,
    }
}

fn assistant_with_calls(calls: Vec<ToolCall>) -> ChatMessage {
    let mut message = ChatMessage::assistant("");
    message.tool_calls = calls;
    message
}

fn tool_call_turn(calls: Vec<ToolCall>) -> EventStream {
    let mut events: Vec<StreamEvent> = calls.iter().cloned().map(StreamEvent::ToolCall).collect();
    events.push(StreamEvent::Complete(assistant_with_calls(calls)));
    Box::pin(stream::iter(events))
}

fn text_turn(text: &str) -> EventStream {
    Box::pin(stream::iter(vec![
        content(text, true),
        StreamEvent::Complete(ChatMessage::assistant(text)),
    ]))
}

fn events_for_scenario(scenario: ClientScenario, call_index: usize) -> EventStream {
    match scenario {
        ClientScenario::ContentThenComplete => text_turn("Hello"),
        ClientScenario::MultiLineContent => Box::pin(stream::iter(vec![
            content("first line\nsecond ", true),
            content("line\n", false),
            StreamEvent::Complete(ChatMessage::assistant("first line\nsecond line\n")),
        ])),
        ClientScenario::SlowReasoningThenContent => Box::pin(async_stream::stream! {
            yield StreamEvent::Reasoning {
                text: "considering the request".to_string(),
            };
            tokio::time::sleep(Duration::from_secs(20)).await;
            yield content("All done.", true);
            yield StreamEvent::Complete(ChatMessage::assistant("All done."));
        }),
        ClientScenario::StreamError => Box::pin(stream::iter(vec![StreamEvent::Error {
            message: "upstream briefly unavailable, and the provider response \
                      included a rather long explanation of why"
                .to_string(),
        }])),
        ClientScenario::NoTerminal => {
            Box::pin(stream::iter(vec![content("half a thought", true)]))
        }
        ClientScenario::HangAfterContent => Box::pin(
            stream::iter(vec![content("partial line\n", true)]).chain(stream::pending()),
        ),
        ClientScenario::ToolCallThenText => {
            if call_index == 0 {
                tool_call_turn(vec![ToolCall::new(
                    "call-1",
                    "script__weather",
                    r#"{"city": "lisbon"}"#,
                )])
            } else {
                text_turn("Sunny in lisbon today.")
            }
        }
        ClientScenario::ToolBatchThenText => {
            if call_index == 0 {
                tool_call_turn(vec![
                    ToolCall::new("call-1", "script__weather", "{not json"),
                    ToolCall::new("call-2", "missing", "{}"),
                    ToolCall::new("call-3", "script__weather", r#"{"city": "lisbon"}"#),
                ])
            } else {
                text_turn("Recovered.")
            }
        }
        ClientScenario::ActionToolThenText => {
            if call_index == 0 {
                tool_call_turn(vec![ToolCall::new(
                    "call-1",
                    super::super::processor::ACTION_TOOL_NAME,
                    r#"{"text": "waves"}"#,
                )])
            } else {
                text_turn("Done.")
            }
        }
        ClientScenario::EndlessToolCalls => tool_call_turn(vec![ToolCall::new(
            format!("call-{call_index}"),
            "script__weather",
            r#"{"city": "lisbon"}"#,
        )]),
    }
}

/// Weather tool used across scenarios; answers from its argument.
pub(super) fn weather_tool() -> Arc<dyn Tool> {
    Arc::new(FunctionTool::new(
        "script__weather",
        "Report the weather for a city",
        serde_json::json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"],
        }),
        |args, _ctx| async move { Ok(format!("Sunny in {}", args.get_str("city")?)) },
    ))
}

pub(super) fn action_tool() -> Arc<dyn Tool> {
    Arc::new(FunctionTool::new(
        super::super::processor::ACTION_TOOL_NAME,
        "Post an emote to the conversation",
        serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}}),
        |_args, _ctx| async move { Ok("sent".to_string()) },
    ))
}

pub(super) fn test_config() -> Config {
    let mut config = Config::default();
    config.bot.prompt = "You are helpful".to_string();
    config
}

pub(super) struct Harness {
    pub(super) engine: TurnEngine,
    pub(super) request: CompletionRequest,
    pub(super) session: Arc<Session>,
    pub(super) sink_rx: mpsc::Receiver<Outbound>,
    pub(super) requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// Build an engine over a stub client, with "hi" already in history.
pub(super) fn harness(scenario: ClientScenario, config: Config, registry: ToolRegistry) -> Harness {
    let config = Arc::new(config);
    let registry = Arc::new(registry);
    let (client, requests) = StubClient::new(scenario);
    let session = Arc::new(Session::new(&config.bot.prompt, config.session.max_history));
    session.append(ChatMessage::user("hi"));
    let (sink, sink_rx) = OutputSink::new(64);

    let request = CompletionRequest::builder()
        .model(config.model.model.clone())
        .messages(session.snapshot())
        .tools(registry.definitions())
        .build();

    let engine = TurnEngine::new(
        config,
        Arc::new(client),
        registry,
        session.clone(),
        sink,
        ToolExecutionContext {
            conversation: "#rust".to_string(),
            sender: Some("alice".to_string()),
            private: false,
        },
    );

    Harness {
        engine,
        request,
        session,
        sink_rx,
        requests,
    }
}

/// Everything queued so far, without waiting.
pub(super) fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

pub(super) fn messages(outbound: &[Outbound]) -> Vec<&str> {
    outbound
        .iter()
        .filter_map(|o| match o {
            Outbound::Message(text) => Some(text.as_str()),
            Outbound::Action(_) => None,
        })
        .collect()
}

pub(super) fn actions(outbound: &[Outbound]) -> Vec<&str> {
    outbound
        .iter()
        .filter_map(|o| match o {
            Outbound::Action(text) => Some(text.as_str()),
            Outbound::Message(_) => None,
        })
        .collect()
}
