//! Configuration
//!
//! - `AppConfig`: process settings loaded from YAML and the environment
//! - Per-kind tool configs and the `ToolConfigs` builder

mod settings;
mod tool_config;

pub use settings::{
    AppConfig, AzureImageDeployment, ConfigError, ConfigResult, FailurePolicy,
    ImageGenerationSettings, DEFAULT_IMAGE_MODEL_NAME,
};
pub use tool_config::{
    AnswerStyleConfig, CitationConfig, CustomToolConfig, DocumentPruningConfig,
    ImageGenerationToolConfig, InternetSearchToolConfig, PrunableConfig, SearchToolConfig,
    ToolConfigs,
};
