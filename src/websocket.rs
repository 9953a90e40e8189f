use axum::{
    extract::ws::{Message, WebSocket},
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::conversations;
use crate::handlers;
use crate::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_uid = state.generate_client_uid();
    info!("New WebSocket connection: {}", client_uid);

    state.register_client(&client_uid);

    let (mut sink, mut receiver) = socket.split();
    let (sender, mut outbox) = mpsc::unbounded_channel::<String>();

    // Forward queued frames to the socket so handlers never block on it.
    let forward = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Initial frames: identity, credential status, seeded greeting.
    let _ = sender.send(
        json!({
            "type": "set-client-uid",
            "client_uid": client_uid,
        })
        .to_string(),
    );
    handlers::send_api_key_status(&state, &client_uid, &sender);
    if let Some(ctx) = state.client_contexts.get(&client_uid) {
        for message in ctx.session.messages() {
            conversations::emit_message(&sender, message);
        }
    }

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) =
                    handlers::handle_message(&state, &client_uid, &text, &sender).await
                {
                    error!("Error handling message from {}: {}", client_uid, e);
                    conversations::send_error(&sender, &e.to_string());
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", client_uid);
                break;
            }
            Err(e) => {
                error!("WebSocket error for {}: {}", client_uid, e);
                break;
            }
            _ => {}
        }
    }

    state.remove_client(&client_uid);
    forward.abort();
    info!("Cleaned up client {}", client_uid);
}
