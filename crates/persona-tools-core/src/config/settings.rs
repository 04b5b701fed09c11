//! Process settings (YAML file + environment)
//!
//! Non-secret settings only. API keys come from a `SecretStore`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Image model used when credentials come from OpenAI
pub const DEFAULT_IMAGE_MODEL_NAME: &str = "dall-e-3";

/// Errors that can occur while loading settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What a construction pass does when one declaration fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the first error and build nothing
    #[default]
    Abort,
    /// Record the failure and keep building the other declarations
    Isolate,
}

impl FailurePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "abort" => Some(FailurePolicy::Abort),
            "isolate" => Some(FailurePolicy::Isolate),
            _ => None,
        }
    }
}

/// Azure image deployment settings (the key lives in the secret store)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureImageDeployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
}

/// Image generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageGenerationSettings {
    pub model_name: String,
    pub temperature: f32,
    pub azure: AzureImageDeployment,
}

impl Default for ImageGenerationSettings {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_IMAGE_MODEL_NAME.to_string(),
            temperature: 0.0,
            azure: AzureImageDeployment::default(),
        }
    }
}

/// Top-level settings file
///
/// ```yaml
/// failure_policy: isolate
/// image_generation:
///   model_name: dall-e-3
///   azure:
///     api_base: https://example.openai.azure.com
///     api_version: '2024-02-01'
///     deployment_name: dalle3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub image_generation: ImageGenerationSettings,
    pub failure_policy: FailurePolicy,
}

impl AppConfig {
    /// Default location (`~/.config/persona-tools/config.yaml` on Linux)
    pub fn user_config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("persona-tools").join("config.yaml")
    }

    /// Load from a YAML file; a missing file yields defaults
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load the user file, then apply process environment overrides
    pub fn from_user_and_env() -> ConfigResult<Self> {
        Self::load(Self::user_config_path())?.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn apply_env_with<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = read("IMAGE_MODEL_NAME") {
            self.image_generation.model_name = model;
        }
        if let Some(raw) = read("GEN_AI_TEMPERATURE") {
            self.image_generation.temperature = raw.trim().parse::<f32>().map_err(|_| ConfigError::InvalidValue {
                key: "GEN_AI_TEMPERATURE".to_string(),
                value: raw.clone(),
            })?;
        }
        let azure = &mut self.image_generation.azure;
        if let Some(base) = read("AZURE_DALLE_API_BASE") {
            azure.api_base = Some(base);
        }
        if let Some(version) = read("AZURE_DALLE_API_VERSION") {
            azure.api_version = Some(version);
        }
        if let Some(deployment) = read("AZURE_DALLE_DEPLOYMENT_NAME") {
            azure.deployment_name = Some(deployment);
        }
        if let Some(raw) = read("TOOL_FAILURE_POLICY") {
            self.failure_policy = FailurePolicy::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "TOOL_FAILURE_POLICY".to_string(),
                value: raw.clone(),
            })?;
        }
        Ok(self)
    }
}
