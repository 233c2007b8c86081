//! Provider adapters.
//!
//! Every backend implements [`Provider`]. The trait's default methods speak the
//! OpenAI chat-completions contract; adapters override only what differs
//! (URL shape, auth header, payload shape, usage location).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{ClientConfig, ConfigRequirement};
use crate::error::{LlmError, LlmResult};
use crate::json_path;
use crate::models::{conversation, ChatMessage, CompletionResponse, MessageRole};
use crate::transport::{ProxyRoute, Transport};
use crate::types::{ProviderKind, TokenUsage};
use crate::utils::clean_answer;

pub mod azure;
pub mod claude;
pub mod cohere;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod tongyi;
pub mod vertex;

pub use azure::AzureProvider;
pub use claude::ClaudeProvider;
pub use cohere::CohereProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use registry::{ProviderFactory, ProviderRegistry};
pub use tongyi::TongyiProvider;
pub use vertex::VertexProvider;

/// Request headers, name to value. Names compare case-insensitively on merge.
pub type Headers = BTreeMap<String, String>;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";

#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderKind;

    /// Configuration with this provider's defaults applied
    fn config(&self) -> &ClientConfig;

    /// What an interactive setup step has to ask for
    fn required_config(&self) -> Vec<ConfigRequirement> {
        base_requirements(self.id())
    }

    fn build_url(&self) -> String {
        let config = self.config();
        join_url(
            &config.expand(&config.api_base),
            &config.expand(&config.completion_path),
        )
    }

    /// Credentials header(s). Bearer token unless overridden.
    fn auth_headers(&self) -> Headers {
        let mut headers = Headers::new();
        let key = &self.config().api_key;
        if !key.is_empty() {
            headers.insert(AUTHORIZATION.to_string(), format!("Bearer {key}"));
        }
        headers
    }

    /// Content type, then auth, then `extra_headers`. Later entries win.
    fn build_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert(CONTENT_TYPE.to_string(), "application/json".to_string());
        for (name, value) in self.auth_headers() {
            merge_header(&mut headers, &name, &value);
        }
        for (name, value) in &self.config().extra_headers {
            merge_header(&mut headers, name, value);
        }
        headers
    }

    fn format_messages(&self, message: &str, history: &[ChatMessage]) -> LlmResult<Value> {
        Ok(chat_completion_payload(self.config(), message, history))
    }

    fn parse_response(&self, raw: &[u8]) -> LlmResult<String> {
        parse_answer(raw, &self.config().answer_path)
    }

    /// Best-effort token counts. `None` when the provider reports nothing.
    fn get_usage(&self, raw: &[u8]) -> Option<TokenUsage> {
        usage_at(raw, "usage", "prompt_tokens", "completion_tokens", Some("total_tokens"))
    }

    async fn make_request(
        &self,
        cancel: &CancellationToken,
        transport: &Transport,
        message: &str,
        history: &[ChatMessage],
    ) -> LlmResult<CompletionResponse> {
        send(self, cancel, transport, message, history).await
    }
}

/// Apply `kind`'s defaults and check the result.
pub(crate) fn prepare(kind: ProviderKind, mut config: ClientConfig) -> LlmResult<ClientConfig> {
    config.apply_defaults(&kind.defaults());
    config.validate()?;
    Ok(config)
}

pub fn base_requirements(kind: ProviderKind) -> Vec<ConfigRequirement> {
    let defaults = kind.defaults();
    vec![
        ConfigRequirement::new(
            "api_base",
            defaults.api_base,
            format!("Enter {} API base", kind.display_name()),
        ),
        ConfigRequirement::new("model", defaults.model, "Enter model name"),
        ConfigRequirement::new("api_key", "", "Enter API key"),
        ConfigRequirement::new("max_tokens", "1024", "Enter max tokens"),
    ]
}

/// `base` without trailing slashes, `/`, `path` without leading slashes
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Insert `name`, replacing any existing header that differs only in case.
pub fn merge_header(headers: &mut Headers, name: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.to_string());
}

pub fn has_header(headers: &Headers, name: &str) -> bool {
    headers.keys().any(|existing| existing.eq_ignore_ascii_case(name))
}

fn header_map(headers: &Headers) -> LlmResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| LlmError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| LlmError::InvalidHeader(name.clone()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Set `key` on a JSON object unless `value` is zero.
pub(crate) fn insert_non_zero(target: &mut Value, key: &str, value: f64) {
    if value != 0.0 {
        if let Some(map) = target.as_object_mut() {
            map.insert(key.to_string(), json!(value));
        }
    }
}

/// `{model, messages, max_tokens}` plus any non-zero sampling parameters
pub(crate) fn chat_completion_payload(
    config: &ClientConfig,
    message: &str,
    history: &[ChatMessage],
) -> Value {
    let mut payload = json!({
        "model": config.model,
        "messages": conversation(history, message),
        "max_tokens": config.max_tokens,
    });
    insert_non_zero(&mut payload, "temperature", config.temperature);
    insert_non_zero(&mut payload, "top_p", config.top_p);
    insert_non_zero(&mut payload, "frequency_penalty", config.frequency_penalty);
    insert_non_zero(&mut payload, "presence_penalty", config.presence_penalty);
    payload
}

/// Split a conversation into joined system text and the remaining turns.
pub(crate) fn split_system(messages: Vec<ChatMessage>) -> (Option<String>, Vec<ChatMessage>) {
    let (system, turns): (Vec<_>, Vec<_>) = messages
        .into_iter()
        .partition(|m| m.role == MessageRole::System);
    let system = (!system.is_empty()).then(|| {
        system
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n\n")
    });
    (system, turns)
}

/// Resolve `path` in a response body and clean up the text found there.
pub fn parse_answer(raw: &[u8], path: &str) -> LlmResult<String> {
    let doc: Value = serde_json::from_slice(raw)?;
    let value = json_path::lookup(&doc, path).ok_or_else(|| LlmError::AnswerNotFound {
        path: path.to_string(),
        body: String::from_utf8_lossy(raw).into_owned(),
    })?;
    Ok(clean_answer(&json_path::as_text(value)))
}

/// Read token counts from the object at `base`. A missing total is the sum.
pub(crate) fn usage_at(
    raw: &[u8],
    base: &str,
    prompt: &str,
    completion: &str,
    total: Option<&str>,
) -> Option<TokenUsage> {
    let doc: Value = serde_json::from_slice(raw).ok()?;
    let usage = json_path::lookup(&doc, base).filter(|v| v.is_object())?;
    let prompt_tokens = json_path::lookup_u64(usage, prompt).unwrap_or(0);
    let completion_tokens = json_path::lookup_u64(usage, completion).unwrap_or(0);
    let total_tokens = total
        .and_then(|path| json_path::lookup_u64(usage, path))
        .unwrap_or(prompt_tokens + completion_tokens);
    Some(TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    })
}

/// The shared request pipeline: URL, headers, payload, POST, status check,
/// usage, answer.
pub async fn send<P: Provider + ?Sized>(
    provider: &P,
    cancel: &CancellationToken,
    transport: &Transport,
    message: &str,
    history: &[ChatMessage],
) -> LlmResult<CompletionResponse> {
    if cancel.is_cancelled() {
        return Err(LlmError::Cancelled);
    }

    let url = provider.build_url();
    let mut headers = provider.build_headers();
    for (name, value) in transport.proxy_headers() {
        if has_header(&headers, name) {
            continue;
        }
        if !matches!(transport.route(), ProxyRoute::Forward { .. }) || url.starts_with("https:") {
            debug!(header = %name, "proxy credentials travel to the provider on this route");
        }
        headers.insert(name.clone(), value.clone());
    }
    let payload = provider
        .format_messages(message, history)
        .map_err(|e| e.context("failed to format messages"))?;

    debug!(provider = %provider.id(), %url, "sending request");
    debug!(payload = %payload, "request payload");

    let request = transport
        .client()
        .post(&url)
        .headers(header_map(&headers)?)
        .json(&payload);
    let timeout = transport.timeout();
    let round_trip = async {
        let response = request
            .send()
            .await
            .map_err(|e| LlmError::from_send(e, timeout))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| LlmError::from_send(e, timeout))?;
        Ok::<_, LlmError>((status, body))
    };

    let (status, body) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(LlmError::Cancelled),
        result = round_trip => result?,
    };

    debug!(%status, body = %String::from_utf8_lossy(&body), "received response");

    if !status.is_success() {
        return Err(LlmError::Api {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    let usage = provider.get_usage(&body);
    if let Some(usage) = &usage {
        info!("{usage}");
    }

    let content = provider.parse_response(&body)?;
    let raw = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Ok(CompletionResponse {
        content,
        usage,
        raw,
    })
}
