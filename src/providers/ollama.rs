use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{ClientConfig, ConfigRequirement};
use crate::error::LlmResult;
use crate::models::{conversation, ChatMessage};
use crate::providers::{base_requirements, insert_non_zero, prepare, Headers, Provider};
use crate::types::{ProviderKind, TokenUsage};

/// Local Ollama server. No credentials and no usage reporting.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    config: ClientConfig,
}

impl OllamaProvider {
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        Ok(Self {
            config: prepare(ProviderKind::Ollama, config)?,
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn id(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn required_config(&self) -> Vec<ConfigRequirement> {
        base_requirements(self.id())
            .into_iter()
            .filter(|r| r.key != "api_key")
            .collect()
    }

    fn auth_headers(&self) -> Headers {
        Headers::new()
    }

    /// `stream: false` is required, the server streams NDJSON otherwise.
    fn format_messages(&self, message: &str, history: &[ChatMessage]) -> LlmResult<Value> {
        let mut options = json!({ "num_predict": self.config.max_tokens });
        insert_non_zero(&mut options, "temperature", self.config.temperature);
        insert_non_zero(&mut options, "top_p", self.config.top_p);
        Ok(json!({
            "model": self.config.model,
            "messages": conversation(history, message),
            "stream": false,
            "options": options,
        }))
    }

    fn get_usage(&self, _raw: &[u8]) -> Option<TokenUsage> {
        None
    }
}
