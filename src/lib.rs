//! Multi-provider LLM dispatch for commit message generation.
//!
//! One configuration record selects a backend adapter; the adapter builds the
//! provider-specific request, sends it over an optionally proxied transport and
//! extracts the answer text from whatever JSON shape the provider returns.

pub mod client;
pub mod config;
pub mod error;
pub mod json_path;
pub mod models;
pub mod providers;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use client::LlmClient;
pub use config::{ClientConfig, ConfigRequirement, ProviderDefaults};
pub use error::{LlmError, LlmResult, TransportError};
pub use models::{ChatMessage, CompletionRequest, CompletionResponse, History, MessageRole};
pub use providers::{Provider, ProviderFactory, ProviderRegistry};
pub use tokio_util::sync::CancellationToken;
pub use transport::{ProxyRoute, Transport};
pub use types::{default_answer_path, ProviderKind, RequestId, TokenUsage};

/// Initialize the logging system. Logs go to stderr, filtered by `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
