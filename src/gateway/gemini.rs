//! Google Gemini `generateContent` client.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{ModelGateway, ModelReply, ToolCall};
use crate::error::ChatError;
use crate::transcript::{Message, Role};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const SYSTEM_INSTRUCTION: &str = "You are an expert Tax Consultant for Uzbekistan, updated with 2025 laws.

Key Data Points for 2025:
- **Personal Income Tax (PIT)**: 12% standard. 1% for students. 0% for dividends (Apr 2022-Dec 2028 for JSC shares).
- **Corporate Income Tax (CIT)**: 15% standard. 20% for banks/mobile/cement. 10% for e-commerce. 1% for knitwear/footwear (preferential).
- **Value Added Tax (VAT)**: 12% standard. 0% exports.

Behavior:
- Answer questions concisely and accurately.
- When a user provides specific numbers (salary, profit, amount), ALWAYS call the appropriate tool to calculate.
- Format monetary output nicely (e.g., \"1,200,000 UZS\").
- If the user speaks Uzbek, reply in Uzbek. If English, reply in English.";

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    // Built once; handed to the API verbatim on every primary call.
    system_instruction: Value,
    tools: Value,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        let model = model.into();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Initialized GeminiClient: model={}, base_url={}", model, base_url);
        Self {
            http: Client::new(),
            base_url,
            model,
            system_instruction: json!({ "parts": [{ "text": SYSTEM_INSTRUCTION }] }),
            tools: tool_declarations(),
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn post(&self, api_key: &str, payload: &Value) -> Result<GenerateContentResponse, ChatError> {
        let response = self
            .http
            .post(self.generate_url())
            .query(&[("key", api_key)])
            .json(payload)
            .send()
            .await?;

        let body: GenerateContentResponse = response.json().await?;
        if let Some(envelope) = body.error {
            return Err(ChatError::RemoteApi(envelope.message));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl ModelGateway for GeminiClient {
    async fn generate(&self, api_key: &str, messages: &[Message]) -> Result<ModelReply, ChatError> {
        let contents: Vec<Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": wire_role(msg.role),
                    "parts": [{ "text": msg.content }],
                })
            })
            .collect();

        let payload = json!({
            "contents": contents,
            "system_instruction": self.system_instruction,
            "tools": self.tools,
        });

        let body = self.post(api_key, &payload).await?;
        Ok(extract_reply(body))
    }

    async fn explain(&self, api_key: &str, result: &Value) -> Result<String, ChatError> {
        let prompt = format!(
            "Explain this tax calculation result to the user naturally: {}",
            result
        );
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let body = self.post(api_key, &payload).await?;
        Ok(extract_reply(body).text)
    }
}

/// Internal roles vs. the Gemini two-valued vocabulary. The rest of the
/// crate never sees `"model"`.
fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// Accumulate all text parts into one string and collect every
/// functionCall part. Absent fields are treated as empty.
fn extract_reply(body: GenerateContentResponse) -> ModelReply {
    let mut reply = ModelReply::default();

    let parts = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    for part in parts {
        if let Some(text) = part.text {
            reply.text.push_str(&text);
        }
        if let Some(call) = part.function_call {
            reply.tool_calls.push(ToolCall {
                name: call.name,
                args: call.args,
            });
        }
    }

    reply
}

fn tool_declarations() -> Value {
    json!([{
        "function_declarations": [
            {
                "name": "calculate_pit",
                "description": "Calculates Personal Income Tax (PIT) for 2025.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "income": { "type": "NUMBER", "description": "Gross income in UZS" },
                        "is_student": { "type": "BOOLEAN", "description": "If the taxpayer is a student (1% preferential rate)" }
                    },
                    "required": ["income"]
                }
            },
            {
                "name": "calculate_cit",
                "description": "Calculates Corporate Income Tax (CIT) for 2025.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "profit": { "type": "NUMBER", "description": "Taxable profit in UZS" },
                        "category": { "type": "STRING", "description": "Category: 'standard', 'bank', 'mobile', 'ecommerce'" }
                    },
                    "required": ["profit"]
                }
            },
            {
                "name": "calculate_vat",
                "description": "Calculates Value Added Tax (VAT) for 2025 (12%).",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "amount": { "type": "NUMBER", "description": "Total amount or base amount" },
                        "includes_vat": { "type": "BOOLEAN", "description": "True if amount includes VAT, False if amount is base" }
                    },
                    "required": ["amount"]
                }
            }
        ]
    }])
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "functionCall", default)]
    function_call: Option<FunctionCallPart>,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPart {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
