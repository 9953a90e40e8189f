pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ChatError;
use crate::transcript::Message;

/// A structured calculation request extracted from a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// What the model answered: accumulated free text plus any requested
/// tool calls. Either side may be empty.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Seam between the orchestrator and the remote generative-language
/// service. Implementations own role normalization and the wire format;
/// callers only ever see transcript messages and `ModelReply`.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send the full transcript with the tax system instruction and the
    /// calculator tool declarations attached.
    async fn generate(&self, api_key: &str, messages: &[Message]) -> Result<ModelReply, ChatError>;

    /// One-shot follow-up: ask the model to explain a calculation result
    /// conversationally. No system instruction, no tools.
    async fn explain(&self, api_key: &str, result: &Value) -> Result<String, ChatError>;
}
