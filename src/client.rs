use metrics::{counter, decrement_gauge, histogram, increment_gauge};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

use crate::config::ClientConfig;
use crate::error::{LlmError, LlmResult};
use crate::models::{ChatMessage, CompletionResponse};
use crate::providers::{Provider, ProviderRegistry};
use crate::transport::Transport;
use crate::types::RequestId;
use crate::utils::format_prompt;

const CODE_EXPLANATION_PROMPT: &str = "Explain the following %s code:\n\n%s";

/// Dispatch facade over one configured provider.
///
/// The adapter is resolved once at construction. Every call builds its own
/// [`Transport`], so a client can be shared across tasks without coordination.
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn Provider>,
}

impl LlmClient {
    /// Resolve the adapter for `config.provider` from the built-in registry.
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        Self::with_registry(config, &ProviderRegistry::builtin())
    }

    pub fn with_registry(config: ClientConfig, registry: &ProviderRegistry) -> LlmResult<Self> {
        Ok(Self {
            provider: registry.resolve(config)?,
        })
    }

    /// Wrap an already constructed adapter.
    pub fn from_provider(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Configuration with the provider's defaults applied
    pub fn config(&self) -> &ClientConfig {
        self.provider.config()
    }

    /// Send `message` after `history` and return the extracted answer.
    pub async fn chat(
        &self,
        cancel: &CancellationToken,
        message: &str,
        history: &[ChatMessage],
    ) -> LlmResult<CompletionResponse> {
        let request_id = RequestId::new();
        let provider = self.provider.id().to_string();
        let model = self.config().model.clone();
        let span = info_span!("chat", request_id = %request_id, provider = %provider, model = %model);

        increment_gauge!("llm_inflight_requests", 1.0, "provider" => provider.clone());
        let start = Instant::now();
        let resp = self
            .dispatch(cancel, message, history)
            .instrument(span)
            .await;
        histogram!("llm_request_latency_seconds", start.elapsed().as_secs_f64(), "provider" => provider.clone());
        decrement_gauge!("llm_inflight_requests", 1.0, "provider" => provider.clone());

        match &resp {
            Ok(r) => {
                counter!("llm_requests_total", 1, "provider" => provider.clone(), "result" => "success");
                if let Some(usage) = &r.usage {
                    counter!("llm_prompt_tokens_total", usage.prompt_tokens, "provider" => provider.clone(), "model" => model.clone());
                    counter!("llm_completion_tokens_total", usage.completion_tokens, "provider" => provider.clone(), "model" => model);
                }
            }
            Err(e) => {
                let result = if e.is_cancelled() { "cancelled" } else { "error" };
                counter!("llm_requests_total", 1, "provider" => provider, "result" => result);
            }
        }
        resp
    }

    async fn dispatch(
        &self,
        cancel: &CancellationToken,
        message: &str,
        history: &[ChatMessage],
    ) -> LlmResult<CompletionResponse> {
        let transport = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            built = Transport::from_config(self.config()) => {
                built.map_err(|e| LlmError::from(e).context("failed to build transport"))?
            }
        };
        self.provider
            .make_request(cancel, &transport, message, history)
            .await
            .map_err(|e| e.context("failed to make request"))
    }

    /// Send a full message list. The last entry is the new turn, everything
    /// before it is history.
    pub async fn raw_chat(
        &self,
        cancel: &CancellationToken,
        messages: &[ChatMessage],
    ) -> LlmResult<CompletionResponse> {
        let Some((last, history)) = messages.split_last() else {
            return Err(LlmError::Configuration("no messages to send".to_string()));
        };
        self.chat(cancel, &last.content, history).await
    }

    /// Fill `template` with the diff and ask for a commit message.
    pub async fn generate_commit_message(&self, diff: &str, template: &str) -> LlmResult<String> {
        self.prompt(format_prompt(template, &[diff])).await
    }

    /// Fill `template` with the message and target language and ask for a translation.
    pub async fn translate_message(
        &self,
        template: &str,
        message: &str,
        lang: &str,
    ) -> LlmResult<String> {
        self.prompt(format_prompt(template, &[message, lang])).await
    }

    pub async fn generate_code_explanation(&self, code: &str, lang: &str) -> LlmResult<String> {
        self.prompt(format_prompt(CODE_EXPLANATION_PROMPT, &[lang, code]))
            .await
    }

    /// One-shot prompt with no history. Dropping the future aborts the request.
    async fn prompt(&self, prompt: String) -> LlmResult<String> {
        let cancel = CancellationToken::new();
        let resp = self.chat(&cancel, &prompt, &[]).await?;
        Ok(resp.content.trim().to_string())
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider.id())
            .field("model", &self.config().model)
            .finish()
    }
}
