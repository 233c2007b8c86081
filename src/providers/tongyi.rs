use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::LlmResult;
use crate::models::{conversation, ChatMessage};
use crate::providers::{insert_non_zero, prepare, usage_at, Provider};
use crate::types::{ProviderKind, TokenUsage};

/// Alibaba Tongyi (DashScope) text generation
#[derive(Debug, Clone)]
pub struct TongyiProvider {
    config: ClientConfig,
}

impl TongyiProvider {
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        Ok(Self {
            config: prepare(ProviderKind::Tongyi, config)?,
        })
    }
}

#[async_trait]
impl Provider for TongyiProvider {
    fn id(&self) -> ProviderKind {
        ProviderKind::Tongyi
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn format_messages(&self, message: &str, history: &[ChatMessage]) -> LlmResult<Value> {
        let mut parameters = json!({ "max_tokens": self.config.max_tokens });
        insert_non_zero(&mut parameters, "temperature", self.config.temperature);
        insert_non_zero(&mut parameters, "top_p", self.config.top_p);
        Ok(json!({
            "model": self.config.model,
            "input": { "messages": conversation(history, message) },
            "parameters": parameters,
        }))
    }

    fn get_usage(&self, raw: &[u8]) -> Option<TokenUsage> {
        usage_at(raw, "usage", "input_tokens", "output_tokens", Some("total_tokens"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nests_messages_under_input() {
        let provider = TongyiProvider::new(ClientConfig::new("tongyi")).unwrap();
        let payload = provider
            .format_messages("diff", &[ChatMessage::assistant("prev")])
            .unwrap();
        assert_eq!(
            payload,
            json!({
                "model": "qwen-turbo",
                "input": {"messages": [
                    {"role": "assistant", "content": "prev"},
                    {"role": "user", "content": "diff"},
                ]},
                "parameters": {"max_tokens": 1024},
            })
        );
        assert_eq!(
            provider.build_url(),
            "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation"
        );
    }

    #[test]
    fn parses_output_text() {
        let provider = TongyiProvider::new(ClientConfig::new("tongyi")).unwrap();
        let raw = br#"{"output": {"text": "refactor: split module"}, "usage": {"input_tokens": 3, "output_tokens": 2, "total_tokens": 5}}"#;
        assert_eq!(provider.parse_response(raw).unwrap(), "refactor: split module");
        assert_eq!(provider.get_usage(raw), Some(TokenUsage::new(3, 2)));
    }
}
