mod common;

use common::{answer, call, last_tool_output, tool_calls, Harness, ScriptedService, SlowEmbedder};
use file_agent_core::prompts::BUDGET_EXCEEDED;
use file_agent_core::{InteractionStatus, LoopState, Role, TranscriptEntry};
use file_agent_protocol::codes;
use file_agent_vector_store::HashingEmbedder;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn endless_tool_calls_stop_at_the_iteration_cap() {
    let harness = Harness::build(
        ScriptedService::label("ON-TOPIC"),
        ScriptedService::replies(vec![tool_calls(vec![call("c", "list_files", json!({}))])]),
        Arc::new(HashingEmbedder::new(384)),
        |config| config.orchestrator.max_iterations = 4,
    );

    let interaction = harness.agent.handle("keep listing my files").await;

    assert_eq!(interaction.status, InteractionStatus::Failed);
    assert_eq!(interaction.answer, BUDGET_EXCEEDED);
    assert_eq!(interaction.iterations, 4);
    assert_eq!(interaction.loop_state, Some(LoopState::Failed));
    assert_eq!(harness.reasoner.calls(), 4);
    assert_eq!(interaction.transcript.tool_results().count(), 4);
    assert!(interaction.transcript.final_answer().is_none());
}

#[tokio::test]
async fn slow_reasoning_exhausts_the_interaction_budget() {
    let harness = Harness::build(
        ScriptedService::label("ON-TOPIC"),
        ScriptedService::replies(vec![answer("too late")]).with_delay(Duration::from_millis(500)),
        Arc::new(HashingEmbedder::new(384)),
        |config| config.orchestrator.interaction_timeout_ms = 50,
    );

    let interaction = harness.agent.handle("list my files").await;

    assert_eq!(interaction.status, InteractionStatus::Failed);
    assert_eq!(interaction.answer, BUDGET_EXCEEDED);
}

#[tokio::test]
async fn reasoning_timeout_is_a_reasoning_failure() {
    let harness = Harness::build(
        ScriptedService::label("ON-TOPIC"),
        ScriptedService::replies(vec![answer("too late")]).with_delay(Duration::from_millis(500)),
        Arc::new(HashingEmbedder::new(384)),
        |config| config.reasoner.timeout_ms = 50,
    );

    let interaction = harness.agent.handle("list my files").await;

    assert_eq!(interaction.status, InteractionStatus::Failed);
    assert!(interaction
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("Reasoning service failed"));
}

#[tokio::test]
async fn parallel_results_keep_call_order() {
    let harness = Harness::build(
        ScriptedService::label("ON-TOPIC"),
        ScriptedService::replies(vec![
            tool_calls(vec![
                call("slow", "search_files", json!({"query": "SLOW notes"})),
                call("fast", "list_files", json!({})),
            ]),
            answer("done"),
        ]),
        Arc::new(SlowEmbedder::new(Duration::from_millis(300))),
        |config| config.orchestrator.parallel_tool_calls = true,
    );
    harness
        .workspace()
        .create_file("notes.txt", "meeting notes")
        .await
        .unwrap();

    let interaction = harness.agent.handle("search my notes and list files").await;

    assert_eq!(interaction.status, InteractionStatus::Completed);
    let results: Vec<(String, String)> = interaction
        .transcript
        .tool_results()
        .map(|r| (r.call_id.clone(), r.tool_name.clone()))
        .collect();
    assert_eq!(
        results,
        vec![
            ("slow".to_string(), "search_files".to_string()),
            ("fast".to_string(), "list_files".to_string()),
        ]
    );

    let second = &harness.reasoner.requests()[1];
    let tool_ids: Vec<Option<&str>> = second
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(tool_ids, vec![Some("slow"), Some("fast")]);
}

#[tokio::test]
async fn parallel_calls_on_one_file_run_in_order() {
    let harness = Harness::build(
        ScriptedService::label("ON-TOPIC"),
        ScriptedService::replies(vec![
            tool_calls(vec![
                call(
                    "w",
                    "create_file",
                    json!({"path": "a.txt", "content": "SLOW hello"}),
                ),
                call("r", "read_file", json!({"path": "./a.txt"})),
                call("l", "list_files", json!({})),
                call("other", "read_file", json!({"path": "b.txt"})),
            ]),
            answer("done"),
        ]),
        Arc::new(SlowEmbedder::new(Duration::from_millis(300))),
        |config| config.orchestrator.parallel_tool_calls = true,
    );
    harness
        .workspace()
        .create_file("b.txt", "already here")
        .await
        .unwrap();

    let interaction = harness.agent.handle("create a.txt and read it back").await;

    assert_eq!(interaction.status, InteractionStatus::Completed);
    assert!(interaction.transcript.tool_results().all(|r| r.is_ok()));
    let outputs: Vec<(String, String)> = interaction
        .transcript
        .tool_results()
        .map(|r| (r.call_id.clone(), r.render()))
        .collect();
    assert_eq!(
        outputs,
        vec![
            (
                "w".to_string(),
                "Created 'a.txt' with 10 characters and updated the index.".to_string()
            ),
            ("r".to_string(), "SLOW hello".to_string()),
            ("l".to_string(), "a.txt\nb.txt".to_string()),
            ("other".to_string(), "already here".to_string()),
        ]
    );
}

#[tokio::test]
async fn tool_timeouts_are_recoverable_and_the_write_still_lands() {
    let reasoner = ScriptedService::new(|request, index| {
        Ok(match index {
            0 => tool_calls(vec![call(
                "w",
                "create_file",
                json!({"path": "slow.txt", "content": "SLOW content"}),
            )]),
            _ => answer(&last_tool_output(request).unwrap_or_default()),
        })
    });
    let harness = Harness::build(
        ScriptedService::label("ON-TOPIC"),
        reasoner,
        Arc::new(SlowEmbedder::new(Duration::from_millis(400))),
        |config| config.orchestrator.tool_timeout_ms = 50,
    );

    let interaction = harness.agent.handle("create slow.txt").await;

    assert_eq!(interaction.status, InteractionStatus::Completed);
    let result = interaction.transcript.tool_results().next().unwrap();
    assert_eq!(result.error_code(), Some(codes::TOOL_TIMEOUT));
    assert!(interaction.answer.contains(codes::TOOL_TIMEOUT));

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(
        harness.workspace().read_file("slow.txt").await.unwrap(),
        "SLOW content"
    );
}

#[tokio::test]
async fn cancellation_is_observed_between_iterations() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let reasoner = ScriptedService::new(move |_, _| {
        trigger.cancel();
        Ok(tool_calls(vec![call("c", "list_files", json!({}))]))
    });
    let harness = Harness::new(ScriptedService::label("ON-TOPIC"), reasoner);

    let interaction = harness
        .agent
        .handle_with_cancel("list my files", &token)
        .await;

    assert_eq!(interaction.status, InteractionStatus::Failed);
    assert_eq!(interaction.answer, "The request was cancelled.");
    assert_eq!(harness.reasoner.calls(), 1);
    // The turn in flight still completed.
    assert_eq!(interaction.transcript.tool_results().count(), 1);
}

#[tokio::test]
async fn duplicate_call_ids_are_made_unique() {
    let harness = Harness::new(
        ScriptedService::label("ON-TOPIC"),
        ScriptedService::replies(vec![
            tool_calls(vec![
                call("x", "list_files", json!({})),
                call("x", "list_files", json!({})),
                call("", "list_files", json!({})),
            ]),
            answer("done"),
        ]),
    );

    let interaction = harness.agent.handle("list my files three times").await;

    let ids: Vec<String> = interaction
        .transcript
        .tool_results()
        .map(|r| r.call_id.clone())
        .collect();
    assert_eq!(ids, vec!["x", "call_1_1", "call_1_2"]);

    let issued: Vec<String> = interaction
        .transcript
        .entries()
        .iter()
        .find_map(|entry| match entry {
            TranscriptEntry::ToolCalls { calls, .. } => {
                Some(calls.iter().map(|c| c.id.clone()).collect())
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(issued, ids);
}
