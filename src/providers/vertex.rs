use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{ClientConfig, ConfigRequirement};
use crate::error::LlmResult;
use crate::models::{conversation, ChatMessage, MessageRole};
use crate::providers::{
    base_requirements, insert_non_zero, prepare, split_system, usage_at, Provider,
};
use crate::types::{ProviderKind, TokenUsage};

/// Google Cloud Vertex AI `predict` endpoint.
///
/// The region and project are placeholders in the URL, so `project_id` must be
/// set; `location` defaults to `us-central1`. The API key is sent as a bearer
/// access token.
#[derive(Debug, Clone)]
pub struct VertexProvider {
    config: ClientConfig,
}

impl VertexProvider {
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        let config = prepare(ProviderKind::Vertex, config)?;
        if config.project_id.trim().is_empty() {
            return Err(config.missing("project_id"));
        }
        Ok(Self { config })
    }
}

fn author(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Assistant => "bot",
        MessageRole::User | MessageRole::System => "user",
    }
}

#[async_trait]
impl Provider for VertexProvider {
    fn id(&self) -> ProviderKind {
        ProviderKind::Vertex
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn required_config(&self) -> Vec<ConfigRequirement> {
        let mut requirements = base_requirements(self.id());
        requirements.push(ConfigRequirement::new(
            "project_id",
            "",
            "Enter Google Cloud project ID",
        ));
        requirements.push(ConfigRequirement::new(
            "location",
            ProviderKind::Vertex.defaults().location,
            "Enter Vertex AI location",
        ));
        requirements
    }

    fn format_messages(&self, message: &str, history: &[ChatMessage]) -> LlmResult<Value> {
        let (system, turns) = split_system(conversation(history, message));
        let messages: Vec<Value> = turns
            .iter()
            .map(|m| json!({"author": author(m.role), "content": m.content}))
            .collect();

        let mut parameters = json!({ "maxOutputTokens": self.config.max_tokens });
        insert_non_zero(&mut parameters, "temperature", self.config.temperature);
        insert_non_zero(&mut parameters, "topP", self.config.top_p);

        Ok(json!({
            "instances": [{
                "context": system.unwrap_or_default(),
                "examples": [],
                "messages": messages,
            }],
            "parameters": parameters,
        }))
    }

    fn get_usage(&self, raw: &[u8]) -> Option<TokenUsage> {
        usage_at(
            raw,
            "metadata.tokenMetadata",
            "inputTokenCount.totalTokens",
            "outputTokenCount.totalTokens",
            None,
        )
    }
}
