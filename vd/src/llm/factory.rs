//! Provider factory - resolve provider names to instances

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::{AnthropicProvider, LlmError, LlmProvider, OpenAiProvider};
use crate::config::{ProviderConfig, ProviderKind};
use crate::errors::WorkflowError;

/// Resolves provider names to [`LlmProvider`] instances
///
/// Providers are constructed once at startup and shared; resolution is a
/// map lookup. Unknown names are a configuration error, fatal to the task
/// that hits them.
pub struct ProviderFactory {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderFactory {
    /// An empty factory (tests register providers explicitly)
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Build every provider named in configuration
    pub fn from_configs(configs: &[ProviderConfig]) -> Result<Self, LlmError> {
        let mut factory = Self::empty();
        for config in configs {
            let provider: Arc<dyn LlmProvider> = match config.kind {
                ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_config(config)?),
                ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(config)?),
            };
            factory.register(&config.name, provider);
        }
        info!(count = factory.providers.len(), "Provider factory built");
        Ok(factory)
    }

    /// Register a provider under a name, replacing any existing binding
    pub fn register(&mut self, name: &str, provider: Arc<dyn LlmProvider>) {
        debug!(%name, "Registering LLM provider");
        self.providers.insert(name.to_string(), provider);
    }

    /// Resolve a provider by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn LlmProvider>, WorkflowError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownProvider(name.to_string()))
    }

    /// Names of all registered providers
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}
