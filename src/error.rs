use thiserror::Error;

/// Failure modes of a chat turn. None of these are fatal: every variant
/// ends up rendered as an error frame or logged and dropped.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("No API key configured. Provide one in the chat settings or set GOOGLE_API_KEY.")]
    MissingCredential,

    #[error("API Error: {0}")]
    RemoteApi(String),

    #[error("Invalid tool call: {0}")]
    InvalidArgument(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
