//! Name-to-adapter lookup.
//!
//! The registry is an explicit map from lower-case provider name to a
//! constructor. Names it does not know resolve through the fallback factory,
//! which builds the OpenAI-compatible adapter.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::LlmResult;
use crate::providers::{
    AzureProvider, ClaudeProvider, CohereProvider, GeminiProvider, OllamaProvider, OpenAiProvider,
    Provider, TongyiProvider, VertexProvider,
};
use crate::types::ProviderKind;

/// Builds an adapter from configuration
pub type ProviderFactory =
    Arc<dyn Fn(ClientConfig) -> LlmResult<Arc<dyn Provider>> + Send + Sync>;

/// Construct the built-in adapter for `kind`.
pub fn build(kind: ProviderKind, config: ClientConfig) -> LlmResult<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match kind {
        ProviderKind::Azure => Arc::new(AzureProvider::new(config)?),
        ProviderKind::Claude => Arc::new(ClaudeProvider::new(config)?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config)?),
        ProviderKind::Cohere => Arc::new(CohereProvider::new(config)?),
        ProviderKind::Vertex => Arc::new(VertexProvider::new(config)?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(config)?),
        ProviderKind::Tongyi => Arc::new(TongyiProvider::new(config)?),
        openai_like => Arc::new(OpenAiProvider::compatible(openai_like, config)?),
    };
    Ok(provider)
}

fn factory_for(kind: ProviderKind) -> ProviderFactory {
    Arc::new(move |config: ClientConfig| build(kind, config))
}

#[derive(Clone)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
    fallback: ProviderFactory,
}

impl ProviderRegistry {
    /// A registry with no named entries. Every name resolves through the fallback.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
            fallback: factory_for(ProviderKind::OpenAi),
        }
    }

    /// Every built-in adapter under its canonical name and aliases
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in ProviderKind::ALL {
            registry.register(kind.as_str(), factory_for(kind));
        }
        for (alias, kind) in ProviderKind::ALIASES {
            registry.register(alias, factory_for(kind));
        }
        registry
    }

    /// Add or replace the factory for `name`.
    pub fn register(&mut self, name: &str, factory: ProviderFactory) {
        self.factories.insert(normalize(name), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize(name))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the adapter selected by `config.provider`.
    pub fn resolve(&self, config: ClientConfig) -> LlmResult<Arc<dyn Provider>> {
        let name = normalize(&config.provider);
        match self.factories.get(&name) {
            Some(factory) => factory(config),
            None => {
                warn!(
                    provider = %config.provider,
                    "unknown provider, using the OpenAI-compatible adapter"
                );
                (self.fallback)(config)
            }
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
