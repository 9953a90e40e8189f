//! Turn orchestration: transcript updates, model calls, tool dispatch.

use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::error::ChatError;
use crate::gateway::ToolCall;
use crate::state::AppState;
use crate::tax;
use crate::transcript::{Message, Role};

/// Process one user turn.
///
/// The transcript is the only state this mutates. On a model-side error
/// the user message stays appended and no assistant message is added;
/// on a tool call the structured result is appended first and a
/// best-effort summary second.
pub async fn process_turn(
    state: &AppState,
    client_uid: &str,
    user_input: &str,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let input = user_input.trim();
    if input.is_empty() {
        return Ok(());
    }

    let Some(api_key) = state.effective_api_key(client_uid) else {
        send_error(sender, &ChatError::MissingCredential.to_string());
        return Ok(());
    };

    // Append the user message and snapshot the transcript so no map
    // guard is held across the network call.
    let transcript = {
        let mut ctx = state
            .client_contexts
            .get_mut(client_uid)
            .ok_or_else(|| anyhow::anyhow!("unknown client: {client_uid}"))?;
        let message = ctx.session.push(Role::User, input);
        emit_message(sender, &message);
        ctx.session.snapshot()
    };

    let reply = match state.gateway.generate(&api_key, &transcript).await {
        Ok(reply) => reply,
        Err(err) => {
            warn!("Model call failed for {}: {}", client_uid, err);
            send_error(sender, &err.to_string());
            return Ok(());
        }
    };

    // Only the first tool call is honored; sequential calls are not
    // supported.
    if let Some(call) = reply.tool_calls.into_iter().next() {
        handle_tool_call(state, client_uid, &api_key, call, sender).await?;
    } else if !reply.text.is_empty() {
        append_and_emit(state, client_uid, Role::Assistant, &reply.text, sender)?;
    }

    Ok(())
}

async fn handle_tool_call(
    state: &AppState,
    client_uid: &str,
    api_key: &str,
    call: ToolCall,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    info!("Dispatching tool call '{}' for {}", call.name, client_uid);

    let result = match tax::dispatch(&call.name, &call.args) {
        Ok(result) => result,
        Err(err) => {
            warn!("Tool dispatch failed for {}: {}", client_uid, err);
            send_error(sender, &err.to_string());
            return Ok(());
        }
    };

    let formatted = format!(
        "**Calculation Result ({}):**\n```json\n{}\n```",
        call.name,
        serde_json::to_string_pretty(&result)?
    );
    append_and_emit(state, client_uid, Role::Assistant, &formatted, sender)?;

    // Best effort: the numbers are already on screen, so a failed or
    // empty summary is dropped rather than retried.
    match state.gateway.explain(api_key, &result).await {
        Ok(summary) if !summary.is_empty() => {
            append_and_emit(state, client_uid, Role::Assistant, &summary, sender)?;
        }
        Ok(_) => {}
        Err(err) => warn!("Summary call failed for {}: {}", client_uid, err),
    }

    Ok(())
}

fn append_and_emit(
    state: &AppState,
    client_uid: &str,
    role: Role,
    content: &str,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let mut ctx = state
        .client_contexts
        .get_mut(client_uid)
        .ok_or_else(|| anyhow::anyhow!("unknown client: {client_uid}"))?;
    let message = ctx.session.push(role, content);
    emit_message(sender, &message);
    Ok(())
}

pub fn emit_message(sender: &UnboundedSender<String>, message: &Message) {
    let _ = sender.send(
        json!({
            "type": "transcript-message",
            "role": message.role,
            "content": message.content,
            "timestamp": message.timestamp,
        })
        .to_string(),
    );
}

pub fn send_error(sender: &UnboundedSender<String>, text: &str) {
    let _ = sender.send(
        json!({
            "type": "error",
            "text": text,
        })
        .to_string(),
    );
}
