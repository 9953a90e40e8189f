use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::gateway::gemini::GeminiClient;
use crate::gateway::ModelGateway;
use crate::transcript::ChatSession;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<dyn ModelGateway>,
    pub client_contexts: Arc<DashMap<String, ClientContext>>,
}

pub struct ClientContext {
    pub client_uid: String,
    pub session: ChatSession,
    /// Key supplied interactively over the socket; wins over the
    /// server-side key.
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let gateway = Arc::new(GeminiClient::new(
            config.gemini.model.clone(),
            config.gemini.base_url.clone(),
        ));

        Self {
            config,
            gateway,
            client_contexts: Arc::new(DashMap::new()),
        }
    }

    pub fn generate_client_uid(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Start a fresh session (seeded greeting) for a connecting client.
    pub fn register_client(&self, client_uid: &str) {
        self.client_contexts.insert(
            client_uid.to_string(),
            ClientContext {
                client_uid: client_uid.to_string(),
                session: ChatSession::new(),
                api_key: None,
            },
        );
    }

    /// Drop the session; the transcript does not survive the connection.
    pub fn remove_client(&self, client_uid: &str) {
        self.client_contexts.remove(client_uid);
    }

    pub fn server_api_key(&self) -> Option<String> {
        self.config
            .gemini
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty()))
    }

    /// Client-supplied key first, then the server-side fallback.
    pub fn effective_api_key(&self, client_uid: &str) -> Option<String> {
        self.client_contexts
            .get(client_uid)
            .and_then(|ctx| ctx.api_key.clone().filter(|k| !k.is_empty()))
            .or_else(|| self.server_api_key())
    }
}
