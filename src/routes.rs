use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;
use crate::tax;
use crate::websocket;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // WebSocket chat shell
        .route("/client-ws", get(websocket::websocket_handler))
        // Health check
        .route("/api/health", get(health_check))
        // Core 2025 rate table
        .route("/api/rates", get(get_rates))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.config.gemini.model,
        "api_key_configured": state.server_api_key().is_some(),
    }))
}

async fn get_rates() -> Json<Value> {
    Json(tax::core_rates())
}
