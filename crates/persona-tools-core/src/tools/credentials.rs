//! Image generation credential resolution
//!
//! Image generation does not have to use the conversation's provider, so
//! credentials are found by walking an ordered chain of strategies. The
//! first strategy that produces credentials wins.
//!
//! Default chain:
//! 1. `primary_model_key`: the primary model is OpenAI and has a key
//! 2. `azure_deployment`: the primary model is Azure and an image deployment
//!    key is configured
//! 3. `persisted_openai_provider`: any stored OpenAI provider with a key

use crate::config::ImageGenerationSettings;
use crate::secrets::SecretStore;
use crate::store::Persistence;
use crate::types::{LlmConfig, AZURE_PROVIDER, OPENAI_PROVIDER};

use super::error::{ToolError, ToolResult};

/// Secret store key of the Azure image deployment API key
pub const AZURE_DALLE_SECRET: &str = "azure_dalle";

/// Everything a strategy may look at
#[derive(Clone, Copy)]
pub struct CredentialContext<'a> {
    /// The conversation's primary model
    pub llm: &'a LlmConfig,
    pub store: &'a dyn Persistence,
    pub secrets: &'a dyn SecretStore,
    pub settings: &'a ImageGenerationSettings,
}

/// One step of the fallback chain
pub trait CredentialStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` passes to the next strategy
    fn resolve(&self, ctx: &CredentialContext<'_>) -> ToolResult<Option<LlmConfig>>;
}

/// Reuse the primary model's OpenAI key with the image model name
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryModelKey;

impl CredentialStrategy for PrimaryModelKey {
    fn name(&self) -> &'static str {
        "primary_model_key"
    }

    fn resolve(&self, ctx: &CredentialContext<'_>) -> ToolResult<Option<LlmConfig>> {
        let llm = ctx.llm;
        if llm.model_provider != OPENAI_PROVIDER {
            return Ok(None);
        }
        let Some(key) = llm.usable_api_key() else {
            return Ok(None);
        };

        Ok(Some(LlmConfig {
            model_provider: llm.model_provider.clone(),
            model_name: ctx.settings.model_name.clone(),
            temperature: ctx.settings.temperature,
            api_key: Some(key.to_string()),
            api_base: llm.api_base.clone(),
            api_version: llm.api_version.clone(),
            max_input_tokens: llm.max_input_tokens,
        }))
    }
}

/// Use the configured Azure image deployment when the primary model is Azure
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureDeployment;

impl CredentialStrategy for AzureDeployment {
    fn name(&self) -> &'static str {
        "azure_deployment"
    }

    fn resolve(&self, ctx: &CredentialContext<'_>) -> ToolResult<Option<LlmConfig>> {
        if ctx.llm.model_provider != AZURE_PROVIDER {
            return Ok(None);
        }
        let Some(key) = ctx.secrets.get(AZURE_DALLE_SECRET) else {
            return Ok(None);
        };
        let azure = &ctx.settings.azure;
        let Some(deployment) = azure.deployment_name.as_deref().filter(|d| !d.is_empty()) else {
            return Ok(None);
        };

        Ok(Some(LlmConfig {
            model_provider: AZURE_PROVIDER.to_string(),
            model_name: format!("azure/{}", deployment),
            temperature: ctx.settings.temperature,
            api_key: Some(key),
            api_base: azure.api_base.clone(),
            api_version: azure.api_version.clone(),
            max_input_tokens: ctx.llm.max_input_tokens,
        }))
    }
}

/// Fall back to an OpenAI provider registered in persistence
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistedOpenAiProvider;

impl CredentialStrategy for PersistedOpenAiProvider {
    fn name(&self) -> &'static str {
        "persisted_openai_provider"
    }

    fn resolve(&self, ctx: &CredentialContext<'_>) -> ToolResult<Option<LlmConfig>> {
        let providers = ctx.store.list_llm_providers()?;
        let Some(provider) = providers
            .iter()
            .find(|p| p.provider == OPENAI_PROVIDER && p.usable_api_key().is_some())
        else {
            return Ok(None);
        };

        Ok(Some(LlmConfig {
            model_provider: provider.provider.clone(),
            model_name: ctx.settings.model_name.clone(),
            temperature: ctx.settings.temperature,
            api_key: provider.api_key.clone(),
            api_base: provider.api_base.clone(),
            api_version: provider.api_version.clone(),
            max_input_tokens: ctx.llm.max_input_tokens,
        }))
    }
}

/// Credentials plus the strategy that produced them
#[derive(Debug, Clone)]
pub struct ResolvedImageCredentials {
    pub config: LlmConfig,
    pub strategy: &'static str,
}

/// Ordered fallback chain for image generation credentials
pub struct ImageCredentialResolver {
    strategies: Vec<Box<dyn CredentialStrategy>>,
}

impl Default for ImageCredentialResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PrimaryModelKey),
            Box::new(AzureDeployment),
            Box::new(PersistedOpenAiProvider),
        ])
    }
}

impl ImageCredentialResolver {
    pub fn new(strategies: Vec<Box<dyn CredentialStrategy>>) -> Self {
        Self { strategies }
    }

    /// Strategy names in the order they are tried
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, ctx: &CredentialContext<'_>) -> ToolResult<ResolvedImageCredentials> {
        for strategy in &self.strategies {
            if let Some(config) = strategy.resolve(ctx)? {
                return Ok(ResolvedImageCredentials {
                    config,
                    strategy: strategy.name(),
                });
            }
        }
        Err(ToolError::configuration(
            "Image generation tool requires an OpenAI API key",
        ))
    }
}

impl std::fmt::Debug for ImageCredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCredentialResolver")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AzureImageDeployment;
    use crate::secrets::MemorySecretStore;
    use crate::store::MemoryPersistence;
    use crate::types::LlmProviderRecord;

    fn settings() -> ImageGenerationSettings {
        ImageGenerationSettings {
            azure: AzureImageDeployment {
                api_base: Some("https://img.azure.example".to_string()),
                api_version: Some("2024-02-01".to_string()),
                deployment_name: Some("dalle3".to_string()),
            },
            ..Default::default()
        }
    }

    fn resolve(
        llm: &LlmConfig,
        store: &MemoryPersistence,
        secrets: &MemorySecretStore,
    ) -> ToolResult<ResolvedImageCredentials> {
        let settings = settings();
        let ctx = CredentialContext {
            llm,
            store,
            secrets,
            settings: &settings,
        };
        ImageCredentialResolver::default().resolve(&ctx)
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(
            ImageCredentialResolver::default().strategy_names(),
            vec!["primary_model_key", "azure_deployment", "persisted_openai_provider"]
        );
    }

    #[test]
    fn test_primary_openai_key_wins() {
        let llm = LlmConfig::new("openai", "gpt-4o", 128_000)
            .with_api_key("sk-primary")
            .with_api_base("https://proxy.example/v1");
        let store = MemoryPersistence::new();
        store.add_llm_provider(LlmProviderRecord::new("db", "openai").with_api_key("sk-db"));
        let secrets = MemorySecretStore::new().with_secret(AZURE_DALLE_SECRET, "az-key");

        let resolved = resolve(&llm, &store, &secrets).unwrap();
        assert_eq!(resolved.strategy, "primary_model_key");
        assert_eq!(resolved.config.api_key.as_deref(), Some("sk-primary"));
        assert_eq!(resolved.config.api_base.as_deref(), Some("https://proxy.example/v1"));
        assert_eq!(resolved.config.model_name, "dall-e-3");
        assert_eq!(resolved.config.max_input_tokens, 128_000);
        // steps 1-2 matched, so persistence is never read
        assert_eq!(store.provider_reads(), 0);
    }

    #[test]
    fn test_azure_deployment() {
        let llm = LlmConfig::new("azure", "gpt-4o", 64_000).with_api_key("az-chat-key");
        let store = MemoryPersistence::new();
        let secrets = MemorySecretStore::new().with_secret(AZURE_DALLE_SECRET, "az-image-key");

        let resolved = resolve(&llm, &store, &secrets).unwrap();
        assert_eq!(resolved.strategy, "azure_deployment");
        assert_eq!(resolved.config.model_provider, "azure");
        assert_eq!(resolved.config.model_name, "azure/dalle3");
        assert_eq!(resolved.config.api_key.as_deref(), Some("az-image-key"));
        assert_eq!(resolved.config.api_version.as_deref(), Some("2024-02-01"));
        assert_eq!(store.provider_reads(), 0);
    }

    #[test]
    fn test_falls_back_to_persisted_openai_provider() {
        let llm = LlmConfig::new("anthropic", "claude-3-5-sonnet", 200_000).with_api_key("ant");
        let store = MemoryPersistence::new();
        store.add_llm_provider(LlmProviderRecord::new("keyless", "openai"));
        store.add_llm_provider(LlmProviderRecord::new("claude", "anthropic").with_api_key("ant"));
        store.add_llm_provider(
            LlmProviderRecord::new("main", "openai")
                .with_api_key("sk-db")
                .with_api_base("https://api.openai.com/v1"),
        );
        let secrets = MemorySecretStore::new();

        let resolved = resolve(&llm, &store, &secrets).unwrap();
        assert_eq!(resolved.strategy, "persisted_openai_provider");
        assert_eq!(resolved.config.api_key.as_deref(), Some("sk-db"));
        assert_eq!(resolved.config.model_name, "dall-e-3");
        assert_eq!(resolved.config.model_provider, "openai");
        assert_eq!(resolved.config.max_input_tokens, 200_000);
        assert_eq!(store.provider_reads(), 1);
    }

    #[test]
    fn test_openai_primary_without_key_falls_through() {
        let llm = LlmConfig::new("openai", "gpt-4o", 128_000);
        let store = MemoryPersistence::new();
        store.add_llm_provider(LlmProviderRecord::new("main", "openai").with_api_key("sk-db"));

        let resolved = resolve(&llm, &store, &MemorySecretStore::new()).unwrap();
        assert_eq!(resolved.strategy, "persisted_openai_provider");
    }

    #[test]
    fn test_no_source_is_configuration_error() {
        let llm = LlmConfig::new("azure", "gpt-4o", 64_000);
        let store = MemoryPersistence::new();

        let err = resolve(&llm, &store, &MemorySecretStore::new()).unwrap_err();
        assert!(matches!(err, ToolError::Configuration(ref m) if m.contains("requires an OpenAI API key")));
    }

    #[test]
    fn test_custom_chain() {
        struct Fixed;
        impl CredentialStrategy for Fixed {
            fn name(&self) -> &'static str {
                "fixed"
            }
            fn resolve(&self, ctx: &CredentialContext<'_>) -> ToolResult<Option<LlmConfig>> {
                Ok(Some(LlmConfig::new("openai", "img", ctx.llm.max_input_tokens).with_api_key("k")))
            }
        }

        let resolver = ImageCredentialResolver::new(vec![Box::new(Fixed), Box::new(PrimaryModelKey)]);
        assert_eq!(resolver.strategy_names(), vec!["fixed", "primary_model_key"]);

        let llm = LlmConfig::new("openai", "gpt-4o", 1_000).with_api_key("sk");
        let store = MemoryPersistence::new();
        let secrets = MemorySecretStore::new();
        let settings = ImageGenerationSettings::default();
        let ctx = CredentialContext { llm: &llm, store: &store, secrets: &secrets, settings: &settings };
        assert_eq!(resolver.resolve(&ctx).unwrap().strategy, "fixed");
    }
}
