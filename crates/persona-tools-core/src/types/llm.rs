//! Language model handles and provider credentials

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tokenizer::{get_tokenizer, Tokenizer};

/// Provider name of the first-party hosted provider
pub const OPENAI_PROVIDER: &str = "openai";
/// Provider name of the secondary hosted provider with image deployments
pub const AZURE_PROVIDER: &str = "azure";

/// Connection settings for a language model
///
/// Also the shape of resolved image-generation credentials: those are built
/// per call and never persisted.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model_provider: String,
    pub model_name: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub max_input_tokens: u32,
}

impl LlmConfig {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, max_input_tokens: u32) -> Self {
        Self {
            model_provider: provider.into(),
            model_name: model.into(),
            temperature: 0.0,
            api_key: None,
            api_base: None,
            api_version: None,
            max_input_tokens,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// The API key, if present and non-empty
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model_provider", &self.model_provider)
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("max_input_tokens", &self.max_input_tokens)
            .finish()
    }
}

/// A provider registration as stored by the persistence layer
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmProviderRecord {
    pub name: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl LlmProviderRecord {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            api_key: None,
            api_base: None,
            api_version: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

impl std::fmt::Debug for LlmProviderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProviderRecord")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// A language model the caller has already set up for this request
pub trait Llm: Send + Sync {
    fn config(&self) -> &LlmConfig;

    /// Tokenizer matching this model
    fn tokenizer(&self) -> Arc<dyn Tokenizer> {
        let config = self.config();
        get_tokenizer(&config.model_name, &config.model_provider)
    }
}

/// An `Llm` that is nothing more than its configuration
#[derive(Debug, Clone)]
pub struct StaticLlm {
    config: LlmConfig,
}

impl StaticLlm {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    pub fn shared(config: LlmConfig) -> Arc<dyn Llm> {
        Arc::new(Self::new(config))
    }
}

impl Llm for StaticLlm {
    fn config(&self) -> &LlmConfig {
        &self.config
    }
}
