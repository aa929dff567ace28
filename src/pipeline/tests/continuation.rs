use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use super::support::*;
use crate::pipeline::processor::PipelineOutcome;
use crate::session::ConversationHistory;
use crate::tools::ToolRegistry;
use crate::types::Role;

#[tokio::test]
async fn tool_results_feed_the_next_turn() {
    let registry = ToolRegistry::new();
    registry.register(weather_tool());
    let mut h = harness(ClientScenario::ToolCallThenText, test_config(), registry);

    let outcome = h.engine.run(h.request, &CancellationToken::new()).await;
    assert_eq!(outcome, PipelineOutcome::Completed);

    // Two model calls: the tool turn and the continuation.
    let requests = h.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].model, requests[1].model);

    // The continuation request carries the tool result after the assistant
    // tool-call message.
    let continuation = &requests[1].messages;
    let tool_msg = continuation
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool message in continuation");
    assert_eq!(tool_msg.content, "Sunny in lisbon");
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call-1"));

    // History: system, user, assistant(tool call), tool, assistant(text).
    let roles: Vec<Role> = h.session.snapshot().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );

    let out = drain(&mut h.sink_rx);
    assert_eq!(actions(&out), vec!["calling weather"]);
    assert_eq!(messages(&out), vec!["Sunny in lisbon today."]);
}

#[tokio::test]
async fn failing_calls_do_not_abort_their_siblings() {
    let registry = ToolRegistry::new();
    registry.register(weather_tool());
    let mut h = harness(ClientScenario::ToolBatchThenText, test_config(), registry);

    let outcome = h.engine.run(h.request, &CancellationToken::new()).await;
    assert_eq!(outcome, PipelineOutcome::Completed);

    let history = h.session.snapshot();
    let tool_messages: Vec<_> = history.iter().filter(|m| m.role == Role::Tool).collect();
    assert_eq!(tool_messages.len(), 3);
    assert!(tool_messages[0].content.starts_with("Error parsing arguments"));
    assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call-1"));
    assert_eq!(tool_messages[1].content, "Tool not found: missing");
    assert_eq!(tool_messages[2].content, "Sunny in lisbon");

    let out = drain(&mut h.sink_rx);
    assert_eq!(messages(&out), vec!["Recovered."]);
}

#[tokio::test]
async fn continuation_stops_at_the_turn_cap() {
    let registry = ToolRegistry::new();
    registry.register(weather_tool());
    let mut config = test_config();
    config.api.max_turns = 3;
    let mut h = harness(ClientScenario::EndlessToolCalls, config, registry);

    let outcome = h.engine.run(h.request, &CancellationToken::new()).await;
    assert_eq!(outcome, PipelineOutcome::Errored);

    // Exactly max_turns streams were issued before failing closed.
    assert_eq!(h.requests.lock().unwrap().len(), 3);
    let out = drain(&mut h.sink_rx);
    assert!(
        messages(&out).iter().any(|m| m.contains("exceeded 3 turns")),
        "expected a turn-cap error, got {out:?}"
    );
}

#[tokio::test]
async fn zero_tool_calls_end_the_loop_immediately() {
    let mut h = harness(
        ClientScenario::ContentThenComplete,
        test_config(),
        ToolRegistry::new(),
    );
    let outcome = h.engine.run(h.request, &CancellationToken::new()).await;
    assert_eq!(outcome, PipelineOutcome::Completed);
    assert_eq!(h.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn action_tool_calls_are_not_announced() {
    let registry = ToolRegistry::new();
    registry.register(action_tool());
    let mut h = harness(ClientScenario::ActionToolThenText, test_config(), registry);

    let outcome = h.engine.run(h.request, &CancellationToken::new()).await;
    assert_eq!(outcome, PipelineOutcome::Completed);

    let out = drain(&mut h.sink_rx);
    assert!(actions(&out).is_empty(), "no calling-notice for the action tool");
    assert_eq!(messages(&out), vec!["Done."]);
}

#[tokio::test]
async fn tool_visibility_can_be_disabled() {
    let registry = ToolRegistry::new();
    registry.register(weather_tool());
    let mut config = test_config();
    config.bot.show_tool_actions = false;
    let mut h = harness(ClientScenario::ToolCallThenText, config, registry);

    let outcome = h.engine.run(h.request, &CancellationToken::new()).await;
    assert_eq!(outcome, PipelineOutcome::Completed);
    let out = drain(&mut h.sink_rx);
    assert!(actions(&out).is_empty());
}
