use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::LlmResult;
use crate::models::{ChatMessage, MessageRole};
use crate::providers::{insert_non_zero, prepare, usage_at, Provider};
use crate::types::{ProviderKind, TokenUsage};

/// Cohere chat API: the new turn is a bare `message`, prior turns go in `chat_history`.
#[derive(Debug, Clone)]
pub struct CohereProvider {
    config: ClientConfig,
}

impl CohereProvider {
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        Ok(Self {
            config: prepare(ProviderKind::Cohere, config)?,
        })
    }
}

fn cohere_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "USER",
        MessageRole::Assistant => "CHATBOT",
        MessageRole::System => "SYSTEM",
    }
}

#[async_trait]
impl Provider for CohereProvider {
    fn id(&self) -> ProviderKind {
        ProviderKind::Cohere
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn format_messages(&self, message: &str, history: &[ChatMessage]) -> LlmResult<Value> {
        let chat_history: Vec<Value> = history
            .iter()
            .map(|m| json!({"role": cohere_role(m.role), "message": m.content}))
            .collect();
        let mut payload = json!({
            "model": self.config.model,
            "chat_history": chat_history,
            "message": message,
            "max_tokens": self.config.max_tokens,
        });
        insert_non_zero(&mut payload, "temperature", self.config.temperature);
        insert_non_zero(&mut payload, "p", self.config.top_p);
        insert_non_zero(&mut payload, "frequency_penalty", self.config.frequency_penalty);
        insert_non_zero(&mut payload, "presence_penalty", self.config.presence_penalty);
        Ok(payload)
    }

    fn get_usage(&self, raw: &[u8]) -> Option<TokenUsage> {
        usage_at(raw, "meta.billed_units", "input_tokens", "output_tokens", None)
    }
}
