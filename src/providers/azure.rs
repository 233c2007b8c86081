use async_trait::async_trait;

use crate::config::{ClientConfig, ConfigRequirement};
use crate::error::LlmResult;
use crate::providers::{base_requirements, join_url, prepare, Headers, Provider};
use crate::types::ProviderKind;

/// Azure OpenAI. Same payload and response as OpenAI, but the deployment is
/// part of the path, the API version is a query parameter and the key goes in
/// an `api-key` header.
#[derive(Debug, Clone)]
pub struct AzureProvider {
    config: ClientConfig,
}

impl AzureProvider {
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        Ok(Self {
            config: prepare(ProviderKind::Azure, config)?,
        })
    }
}

#[async_trait]
impl Provider for AzureProvider {
    fn id(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn required_config(&self) -> Vec<ConfigRequirement> {
        let mut requirements = base_requirements(self.id());
        requirements[0].prompt_message = "Enter Azure OpenAI endpoint".to_string();
        requirements[1].prompt_message = "Enter deployment name".to_string();
        requirements.push(ConfigRequirement::new(
            "api_version",
            ProviderKind::Azure.defaults().api_version,
            "Enter Azure OpenAI API version",
        ));
        requirements
    }

    /// A query string already present in `api_base` moves behind the path.
    fn build_url(&self) -> String {
        let config = &self.config;
        let (base, query) = match config.api_base.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (config.api_base.as_str(), None),
        };
        let url = join_url(base, &config.expand(&config.completion_path));
        match query {
            Some(query) if query.contains("api-version=") => format!("{url}?{query}"),
            Some(query) if !query.is_empty() => {
                format!("{url}?{query}&api-version={}", config.api_version)
            }
            _ => format!("{url}?api-version={}", config.api_version),
        }
    }

    fn auth_headers(&self) -> Headers {
        let mut headers = Headers::new();
        if !self.config.api_key.is_empty() {
            headers.insert("api-key".to_string(), self.config.api_key.clone());
        }
        headers
    }
}
