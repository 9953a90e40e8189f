//! End-to-end turn orchestration against a mock Gemini endpoint.

use httpmock::prelude::*;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use uzbektax_backend::config::Config;
use uzbektax_backend::conversations::process_turn;
use uzbektax_backend::state::AppState;
use uzbektax_backend::transcript::Role;

const CLIENT: &str = "test-client";

fn state_for(server: &MockServer, api_key: Option<&str>) -> AppState {
    let mut config = Config::default();
    config.gemini.base_url = server.url("");
    config.gemini.api_key = api_key.map(str::to_string);
    let state = AppState::new(config);
    state.register_client(CLIENT);
    state
}

fn drain(outbox: &mut mpsc::UnboundedReceiver<String>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(text) = outbox.try_recv() {
        frames.push(serde_json::from_str(&text).unwrap());
    }
    frames
}

fn session_messages(state: &AppState) -> Vec<(Role, String)> {
    state
        .client_contexts
        .get(CLIENT)
        .unwrap()
        .session
        .messages()
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect()
}

#[tokio::test]
async fn plain_text_reply_is_appended_verbatim() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "The standard VAT rate is 12%." }] }
            }]
        }));
    });

    let state = state_for(&server, Some("test-key"));
    let (sender, mut outbox) = mpsc::unbounded_channel();

    process_turn(&state, CLIENT, "What is the VAT rate?", &sender)
        .await
        .unwrap();

    let messages = session_messages(&state);
    assert_eq!(messages.len(), 3); // greeting + user + assistant
    assert_eq!(messages[1], (Role::User, "What is the VAT rate?".to_string()));
    assert_eq!(
        messages[2],
        (Role::Assistant, "The standard VAT rate is 12%.".to_string())
    );

    let frames = drain(&mut outbox);
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f["type"] == "transcript-message"));
}

#[tokio::test]
async fn error_envelope_leaves_user_message_without_reply() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(400).json_body(json!({
            "error": { "message": "Resource has been exhausted" }
        }));
    });

    let state = state_for(&server, Some("test-key"));
    let (sender, mut outbox) = mpsc::unbounded_channel();

    process_turn(&state, CLIENT, "hello", &sender).await.unwrap();

    let messages = session_messages(&state);
    assert_eq!(messages.len(), 2); // greeting + user, no assistant
    assert_eq!(messages[1].0, Role::User);

    let frames = drain(&mut outbox);
    let error = frames.iter().find(|f| f["type"] == "error").unwrap();
    assert!(error["text"]
        .as_str()
        .unwrap()
        .contains("Resource has been exhausted"));
}

#[tokio::test]
async fn tool_call_turn_appends_result_and_summary() {
    let server = MockServer::start();
    let primary = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent")
            .body_contains("system_instruction");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "functionCall": {
                            "name": "calculate_vat",
                            "args": { "amount": 50000, "includes_vat": false }
                        }
                    }]
                }
            }]
        }));
    });
    let summary = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent")
            .body_contains("Explain this tax calculation result");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "VAT adds 6,000 UZS, totalling 56,000 UZS." }] }
            }]
        }));
    });

    let state = state_for(&server, Some("test-key"));
    let (sender, mut outbox) = mpsc::unbounded_channel();

    process_turn(&state, CLIENT, "Add VAT to 50000 UZS", &sender)
        .await
        .unwrap();

    let messages = session_messages(&state);
    assert_eq!(messages.len(), 4); // greeting + user + result + summary
    assert_eq!(messages[2].0, Role::Assistant);
    assert!(messages[2].1.contains("Calculation Result (calculate_vat)"));
    assert!(messages[2].1.contains("total_amount"));
    assert!(messages[2].1.contains("56000"));
    assert_eq!(
        messages[3],
        (
            Role::Assistant,
            "VAT adds 6,000 UZS, totalling 56,000 UZS.".to_string()
        )
    );

    primary.assert();
    summary.assert();

    let frames = drain(&mut outbox);
    assert_eq!(
        frames
            .iter()
            .filter(|f| f["type"] == "transcript-message")
            .count(),
        3
    );
}

#[tokio::test]
async fn only_first_tool_call_is_honored_and_empty_summary_is_dropped() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent")
            .body_contains("system_instruction");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {
                            "functionCall": {
                                "name": "calculate_vat",
                                "args": { "amount": 112000 }
                            }
                        },
                        {
                            "functionCall": {
                                "name": "calculate_pit",
                                "args": { "income": 1 }
                            }
                        }
                    ]
                }
            }]
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent")
            .body_contains("Explain this tax calculation result");
        then.status(200).json_body(json!({ "candidates": [] }));
    });

    let state = state_for(&server, Some("test-key"));
    let (sender, _outbox) = mpsc::unbounded_channel();

    process_turn(&state, CLIENT, "VAT inside 112000?", &sender)
        .await
        .unwrap();

    let messages = session_messages(&state);
    assert_eq!(messages.len(), 3); // no summary message appended
    assert!(messages[2].1.contains("calculate_vat"));
    assert!(!messages[2].1.contains("calculate_pit"));
}

#[tokio::test]
async fn failed_summary_call_is_swallowed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent")
            .body_contains("system_instruction");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "functionCall": {
                            "name": "calculate_pit",
                            "args": { "income": 1200000 }
                        }
                    }]
                }
            }]
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent")
            .body_contains("Explain this tax calculation result");
        then.status(500).json_body(json!({
            "error": { "message": "Internal error" }
        }));
    });

    let state = state_for(&server, Some("test-key"));
    let (sender, mut outbox) = mpsc::unbounded_channel();

    process_turn(&state, CLIENT, "My salary is 1200000", &sender)
        .await
        .unwrap();

    let messages = session_messages(&state);
    assert_eq!(messages.len(), 3); // structured result only, summary dropped
    assert!(messages[2].1.contains("Calculation Result (calculate_pit)"));

    // The swallowed failure must not surface as a visible error.
    let frames = drain(&mut outbox);
    assert!(frames.iter().all(|f| f["type"] != "error"));
}

#[tokio::test]
async fn missing_required_argument_aborts_turn() {
    let server = MockServer::start();
    let primary = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "functionCall": { "name": "calculate_pit", "args": {} }
                    }]
                }
            }]
        }));
    });

    let state = state_for(&server, Some("test-key"));
    let (sender, mut outbox) = mpsc::unbounded_channel();

    process_turn(&state, CLIENT, "calculate my tax", &sender)
        .await
        .unwrap();

    let messages = session_messages(&state);
    assert_eq!(messages.len(), 2); // greeting + user only
    primary.assert_hits(1); // no summary call was issued

    let frames = drain(&mut outbox);
    let error = frames.iter().find(|f| f["type"] == "error").unwrap();
    assert!(error["text"].as_str().unwrap().contains("income"));
}

#[tokio::test]
async fn missing_credential_blocks_turn_before_any_call() {
    std::env::remove_var("GOOGLE_API_KEY");

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200).json_body(json!({ "candidates": [] }));
    });

    let state = state_for(&server, None);
    let (sender, mut outbox) = mpsc::unbounded_channel();

    process_turn(&state, CLIENT, "hello", &sender).await.unwrap();

    let messages = session_messages(&state);
    assert_eq!(messages.len(), 1); // transcript untouched beyond the greeting
    mock.assert_hits(0);

    let frames = drain(&mut outbox);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "error");
    assert!(frames[0]["text"].as_str().unwrap().contains("API key"));
}

#[tokio::test]
async fn empty_input_is_ignored() {
    let server = MockServer::start();
    let state = state_for(&server, Some("test-key"));
    let (sender, mut outbox) = mpsc::unbounded_channel();

    process_turn(&state, CLIENT, "   ", &sender).await.unwrap();

    assert_eq!(session_messages(&state).len(), 1);
    assert!(drain(&mut outbox).is_empty());
}
