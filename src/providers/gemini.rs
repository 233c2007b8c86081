use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::LlmResult;
use crate::models::{conversation, ChatMessage, MessageRole};
use crate::providers::{insert_non_zero, prepare, split_system, usage_at, Headers, Provider};
use crate::types::{ProviderKind, TokenUsage};

/// Google Gemini `generateContent`
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    config: ClientConfig,
}

impl GeminiProvider {
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        Ok(Self {
            config: prepare(ProviderKind::Gemini, config)?,
        })
    }
}

fn gemini_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Assistant => "model",
        MessageRole::User | MessageRole::System => "user",
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn auth_headers(&self) -> Headers {
        let mut headers = Headers::new();
        if !self.config.api_key.is_empty() {
            headers.insert("x-goog-api-key".to_string(), self.config.api_key.clone());
        }
        headers
    }

    fn format_messages(&self, message: &str, history: &[ChatMessage]) -> LlmResult<Value> {
        let (system, turns) = split_system(conversation(history, message));
        let contents: Vec<Value> = turns
            .iter()
            .map(|m| json!({"role": gemini_role(m.role), "parts": [{"text": m.content}]}))
            .collect();

        let mut generation = json!({ "maxOutputTokens": self.config.max_tokens });
        insert_non_zero(&mut generation, "temperature", self.config.temperature);
        insert_non_zero(&mut generation, "topP", self.config.top_p);

        let mut payload = json!({
            "contents": contents,
            "generationConfig": generation,
        });
        if let Some(system) = system {
            payload["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        Ok(payload)
    }

    fn get_usage(&self, raw: &[u8]) -> Option<TokenUsage> {
        usage_at(
            raw,
            "usageMetadata",
            "promptTokenCount",
            "candidatesTokenCount",
            Some("totalTokenCount"),
        )
    }
}
