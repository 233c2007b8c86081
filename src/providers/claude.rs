use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{ClientConfig, ConfigRequirement};
use crate::error::LlmResult;
use crate::models::{conversation, ChatMessage};
use crate::providers::{
    base_requirements, insert_non_zero, prepare, split_system, usage_at, Headers, Provider,
};
use crate::types::{ProviderKind, TokenUsage};

/// Anthropic Messages API
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    config: ClientConfig,
}

impl ClaudeProvider {
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        Ok(Self {
            config: prepare(ProviderKind::Claude, config)?,
        })
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn id(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn required_config(&self) -> Vec<ConfigRequirement> {
        let mut requirements = base_requirements(self.id());
        requirements.push(ConfigRequirement::new(
            "anthropic_version",
            ProviderKind::Claude.defaults().anthropic_version,
            "Enter Anthropic API version",
        ));
        requirements
    }

    fn auth_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert(
            "anthropic-version".to_string(),
            self.config.anthropic_version.clone(),
        );
        if !self.config.api_key.is_empty() {
            headers.insert("x-api-key".to_string(), self.config.api_key.clone());
        }
        headers
    }

    /// System turns go to the top-level `system` field; Claude rejects them in `messages`.
    fn format_messages(&self, message: &str, history: &[ChatMessage]) -> LlmResult<Value> {
        let (system, turns) = split_system(conversation(history, message));
        let mut payload = json!({
            "model": self.config.model,
            "messages": turns,
            "max_tokens": self.config.max_tokens,
        });
        if let Some(system) = system {
            payload["system"] = Value::String(system);
        }
        insert_non_zero(&mut payload, "temperature", self.config.temperature);
        insert_non_zero(&mut payload, "top_p", self.config.top_p);
        Ok(payload)
    }

    fn get_usage(&self, raw: &[u8]) -> Option<TokenUsage> {
        usage_at(raw, "usage", "input_tokens", "output_tokens", None)
    }
}
