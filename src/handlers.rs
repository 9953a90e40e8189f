use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::conversations;
use crate::state::AppState;
use crate::transcript::ChatSession;

pub async fn handle_message(
    state: &AppState,
    client_uid: &str,
    text: &str,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let msg: Value = serde_json::from_str(text)?;
    let msg_type = msg.get("type").and_then(|v| v.as_str());

    match msg_type {
        Some("text-input") => {
            let input = msg.get("text").and_then(|v| v.as_str()).unwrap_or("");
            conversations::process_turn(state, client_uid, input, sender).await?;
        }
        Some("set-api-key") => {
            handle_set_api_key(state, client_uid, &msg, sender)?;
        }
        Some("fetch-history") => {
            handle_fetch_history(state, client_uid, sender)?;
        }
        Some("new-session") => {
            handle_new_session(state, client_uid, sender)?;
        }
        _ => {
            warn!("Unknown message type: {:?}", msg_type);
        }
    }

    Ok(())
}

fn handle_set_api_key(
    state: &AppState,
    client_uid: &str,
    msg: &Value,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let key = msg
        .get("key")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);

    if let Some(mut ctx) = state.client_contexts.get_mut(client_uid) {
        ctx.api_key = key;
    }

    send_api_key_status(state, client_uid, sender);
    Ok(())
}

fn handle_fetch_history(
    state: &AppState,
    client_uid: &str,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    if let Some(ctx) = state.client_contexts.get(client_uid) {
        let _ = sender.send(
            json!({
                "type": "history-data",
                "messages": ctx.session.messages(),
            })
            .to_string(),
        );
    }
    Ok(())
}

/// Reset the transcript back to the seeded greeting.
fn handle_new_session(
    state: &AppState,
    client_uid: &str,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    if let Some(mut ctx) = state.client_contexts.get_mut(client_uid) {
        ctx.session = ChatSession::new();
    }
    handle_fetch_history(state, client_uid, sender)
}

pub fn send_api_key_status(
    state: &AppState,
    client_uid: &str,
    sender: &UnboundedSender<String>,
) {
    let _ = sender.send(
        json!({
            "type": "api-key-status",
            "configured": state.effective_api_key(client_uid).is_some(),
        })
        .to_string(),
    );
}
