use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{LlmError, LlmResult};

const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Flat configuration record read by every provider adapter.
///
/// String fields use the empty string for "unset". Provider constructors fill
/// empty fields from [`ProviderDefaults`] exactly once; nothing writes to the
/// record afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Key selecting the adapter
    pub provider: String,
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    /// Sub-path appended to `api_base`
    pub completion_path: String,
    /// Dotted JSON path locating the answer in the response
    pub answer_path: String,
    /// Merged last so callers can override computed headers
    pub extra_headers: BTreeMap<String, String>,
    pub proxy: Option<String>,
    /// Request timeout in seconds, 0 disables it
    pub timeout: u64,
    pub anthropic_version: String,
    pub api_version: String,
    pub location: String,
    pub project_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_base: String::new(),
            api_key: String::new(),
            model: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            top_p: 0.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            completion_path: String::new(),
            answer_path: String::new(),
            extra_headers: BTreeMap::new(),
            proxy: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            anthropic_version: String::new(),
            api_version: String::new(),
            location: String::new(),
            project_id: String::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Request timeout, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    /// Fill every empty field from `defaults`. Populated fields are never touched,
    /// so applying the same defaults twice is a no-op.
    pub fn apply_defaults(&mut self, defaults: &ProviderDefaults) {
        fill(&mut self.api_base, defaults.api_base);
        fill(&mut self.model, defaults.model);
        fill(&mut self.completion_path, defaults.completion_path);
        fill(&mut self.answer_path, defaults.answer_path);
        fill(&mut self.anthropic_version, defaults.anthropic_version);
        fill(&mut self.api_version, defaults.api_version);
        fill(&mut self.location, defaults.location);
        if self.max_tokens == 0 {
            self.max_tokens = DEFAULT_MAX_TOKENS;
        }
    }

    /// Check the fields every request needs.
    pub fn validate(&self) -> LlmResult<()> {
        if self.api_base.trim().is_empty() {
            return Err(self.missing("api_base"));
        }
        if self.model.trim().is_empty() {
            return Err(self.missing("model"));
        }
        Ok(())
    }

    pub(crate) fn missing(&self, field: &'static str) -> LlmError {
        LlmError::MissingField {
            provider: self.provider.clone(),
            field,
        }
    }

    /// Substitute `{model}`, `{location}` and `{project_id}` placeholders.
    pub(crate) fn expand(&self, template: &str) -> String {
        template
            .replace("{model}", &self.model)
            .replace("{location}", &self.location)
            .replace("{project_id}", &self.project_id)
    }
}

fn fill(field: &mut String, default: &str) {
    if field.is_empty() && !default.is_empty() {
        *field = default.to_string();
    }
}

/// Per-provider defaults. Empty strings mean "no default".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDefaults {
    pub api_base: &'static str,
    pub model: &'static str,
    pub completion_path: &'static str,
    pub answer_path: &'static str,
    pub anthropic_version: &'static str,
    pub api_version: &'static str,
    pub location: &'static str,
}

impl ProviderDefaults {
    pub const EMPTY: ProviderDefaults = ProviderDefaults {
        api_base: "",
        model: "",
        completion_path: "",
        answer_path: "",
        anthropic_version: "",
        api_version: "",
        location: "",
    };
}

/// A value an interactive setup step must collect. Not consulted at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRequirement {
    pub key: String,
    pub default_value: String,
    pub prompt_message: String,
}

impl ConfigRequirement {
    pub fn new(
        key: impl Into<String>,
        default_value: impl Into<String>,
        prompt_message: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            default_value: default_value.into(),
            prompt_message: prompt_message.into(),
        }
    }
}
