use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ProviderDefaults;

/// Built-in provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    ChatGlm,
    Kimi,
    Silicon,
    SambaNova,
    Mistral,
    Xai,
    Azure,
    Claude,
    Gemini,
    Cohere,
    Vertex,
    Ollama,
    Tongyi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 15] = [
        ProviderKind::OpenAi,
        ProviderKind::DeepSeek,
        ProviderKind::ChatGlm,
        ProviderKind::Kimi,
        ProviderKind::Silicon,
        ProviderKind::SambaNova,
        ProviderKind::Mistral,
        ProviderKind::Xai,
        ProviderKind::Azure,
        ProviderKind::Claude,
        ProviderKind::Gemini,
        ProviderKind::Cohere,
        ProviderKind::Vertex,
        ProviderKind::Ollama,
        ProviderKind::Tongyi,
    ];

    /// Alternate configuration names and the backend they select
    pub const ALIASES: [(&'static str, ProviderKind); 5] = [
        ("anthropic", ProviderKind::Claude),
        ("azure-openai", ProviderKind::Azure),
        ("moonshot", ProviderKind::Kimi),
        ("siliconflow", ProviderKind::Silicon),
        ("dashscope", ProviderKind::Tongyi),
    ];

    /// Look up a provider by its configuration name. Case-insensitive, accepts aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .or_else(|| {
                Self::ALIASES
                    .into_iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, kind)| kind)
            })
    }

    /// Canonical configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::ChatGlm => "chatglm",
            ProviderKind::Kimi => "kimi",
            ProviderKind::Silicon => "silicon",
            ProviderKind::SambaNova => "sambanova",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Xai => "xai",
            ProviderKind::Azure => "azure",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Cohere => "cohere",
            ProviderKind::Vertex => "vertex",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Tongyi => "tongyi",
        }
    }

    /// Human-readable name used in setup prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::ChatGlm => "ChatGLM",
            ProviderKind::Kimi => "Kimi",
            ProviderKind::Silicon => "SiliconFlow",
            ProviderKind::SambaNova => "SambaNova",
            ProviderKind::Mistral => "Mistral",
            ProviderKind::Xai => "xAI",
            ProviderKind::Azure => "Azure OpenAI",
            ProviderKind::Claude => "Claude",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Cohere => "Cohere",
            ProviderKind::Vertex => "Vertex AI",
            ProviderKind::Ollama => "Ollama",
            ProviderKind::Tongyi => "Tongyi",
        }
    }

    /// Whether the backend speaks the OpenAI chat-completions wire format unchanged
    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            ProviderKind::OpenAi
                | ProviderKind::DeepSeek
                | ProviderKind::ChatGlm
                | ProviderKind::Kimi
                | ProviderKind::Silicon
                | ProviderKind::SambaNova
                | ProviderKind::Mistral
                | ProviderKind::Xai
        )
    }

    /// Values used to fill empty configuration fields for this provider
    pub fn defaults(&self) -> ProviderDefaults {
        const OPENAI_ANSWER: &str = "choices.0.message.content";
        const CHAT_COMPLETIONS: &str = "chat/completions";

        let openai_like = |api_base: &'static str, model: &'static str| ProviderDefaults {
            api_base,
            model,
            completion_path: CHAT_COMPLETIONS,
            answer_path: OPENAI_ANSWER,
            ..ProviderDefaults::EMPTY
        };

        match self {
            ProviderKind::OpenAi => openai_like("https://api.openai.com/v1", "gpt-4o"),
            ProviderKind::DeepSeek => openai_like("https://api.deepseek.com/v1", "deepseek-chat"),
            ProviderKind::ChatGlm => {
                openai_like("https://open.bigmodel.cn/api/paas/v4", "glm-4-flash")
            }
            ProviderKind::Kimi => openai_like("https://api.moonshot.cn/v1", "moonshot-v1-8k"),
            ProviderKind::Silicon => {
                openai_like("https://api.siliconflow.cn/v1", "Qwen/Qwen2.5-7B-Instruct")
            }
            ProviderKind::SambaNova => {
                openai_like("https://api.sambanova.ai/v1", "Meta-Llama-3.1-8B-Instruct")
            }
            ProviderKind::Mistral => openai_like("https://api.mistral.ai/v1", "mistral-large-latest"),
            ProviderKind::Xai => openai_like("https://api.x.ai/v1", "grok-beta"),
            ProviderKind::Azure => ProviderDefaults {
                completion_path: "openai/deployments/{model}/chat/completions",
                api_version: "2024-02-01",
                ..openai_like("", "gpt-35-turbo")
            },
            ProviderKind::Claude => ProviderDefaults {
                api_base: "https://api.anthropic.com/v1",
                model: "claude-3-5-sonnet-latest",
                completion_path: "messages",
                answer_path: "content.0.text",
                anthropic_version: "2023-06-01",
                ..ProviderDefaults::EMPTY
            },
            ProviderKind::Gemini => ProviderDefaults {
                api_base: "https://generativelanguage.googleapis.com/v1beta",
                model: "gemini-1.5-flash",
                completion_path: "models/{model}:generateContent",
                answer_path: "candidates.0.content.parts.0.text",
                ..ProviderDefaults::EMPTY
            },
            ProviderKind::Cohere => ProviderDefaults {
                api_base: "https://api.cohere.com/v1",
                model: "command-r-plus",
                completion_path: "chat",
                answer_path: "text",
                ..ProviderDefaults::EMPTY
            },
            ProviderKind::Vertex => ProviderDefaults {
                api_base: "https://{location}-aiplatform.googleapis.com/v1",
                model: "chat-bison",
                completion_path:
                    "projects/{project_id}/locations/{location}/publishers/google/models/{model}:predict",
                answer_path: "predictions.0.candidates.0",
                location: "us-central1",
                ..ProviderDefaults::EMPTY
            },
            ProviderKind::Ollama => ProviderDefaults {
                api_base: "http://localhost:11434/api",
                model: "llama2",
                completion_path: "chat",
                answer_path: "message.content",
                ..ProviderDefaults::EMPTY
            },
            ProviderKind::Tongyi => ProviderDefaults {
                api_base: "https://dashscope.aliyuncs.com/api/v1",
                model: "qwen-turbo",
                completion_path: "services/aigc/text-generation/generation",
                answer_path: "output.text",
                ..ProviderDefaults::EMPTY
            },
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default answer path for a provider name. Unknown names get the OpenAI shape.
pub fn default_answer_path(provider: &str) -> &'static str {
    ProviderKind::from_name(provider)
        .unwrap_or(ProviderKind::OpenAi)
        .defaults()
        .answer_path
}

/// Request ID for tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token usage reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token usage> prompt: {}, completion: {}, total: {}",
            self.prompt_tokens, self.completion_tokens, self.total_tokens
        )
    }
}
