use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::LlmResult;
use crate::providers::{prepare, Provider};
use crate::types::ProviderKind;

/// OpenAI and the backends that speak its chat-completions format unchanged
/// (DeepSeek, ChatGLM, Kimi, SiliconFlow, SambaNova, Mistral, xAI).
///
/// Everything comes from the trait defaults; only the defaults table differs
/// per backend.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    kind: ProviderKind,
    config: ClientConfig,
}

impl OpenAiProvider {
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        Self::compatible(ProviderKind::OpenAi, config)
    }

    /// An adapter for an OpenAI-compatible backend. Other kinds are treated as OpenAI.
    pub fn compatible(kind: ProviderKind, config: ClientConfig) -> LlmResult<Self> {
        let kind = if kind.is_openai_compatible() {
            kind
        } else {
            ProviderKind::OpenAi
        };
        Ok(Self {
            kind,
            config: prepare(kind, config)?,
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> ProviderKind {
        self.kind
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }
}
