//! Persona Tools Core
//!
//! Resolves an assistant persona's declared toolset into runtime-ready tools
//! for a single conversational turn, and computes the token budget the tool
//! definitions take.
//!
//! ## Construction
//!
//! Declarations either reference a built-in capability (search, image
//! generation, internet search) or carry an OpenAPI 3 schema that expands to
//! one tool per operation:
//!
//! ```rust,ignore
//! use persona_tools_core::tools::{ConstructionRequest, ToolConstructor, ToolServices};
//! use persona_tools_core::config::{AppConfig, ToolConfigs};
//!
//! let constructor = ToolConstructor::new(AppConfig::default(), secrets, services)
//!     .with_logger(logger);
//!
//! let built = constructor.construct_tools(&request, ToolConfigs::new())?;
//! for tool in built.all_tools() {
//!     println!("{}", tool.definition().to_function_json());
//! }
//!
//! // Budget for the pruning stage
//! let reserved = built.search_config.map(|c| c.reserved_tokens());
//! ```

pub mod types;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod store;
pub mod tokenizer;
pub mod tools;
pub mod api;

// Re-export commonly used types
pub use types::{
    CapabilityKind, ContextDocument, Llm, LlmConfig, OptionalSearchSetting, Persona,
    PromptConfig, StaticLlm, Tool, ToolDeclaration, ToolDefinition, ToolId, ToolResponse, User,
};

pub use secrets::{ChainSecretStore, EnvSecretStore, MemorySecretStore, SecretStore};

pub use logging::{ConsoleLogger, Logger, MemoryLogger, NoOpLogger, SharedLogger};

pub use config::{AppConfig, ConfigError, FailurePolicy, ToolConfigs};

pub use store::{MemoryPersistence, Persistence, StoreError};

pub use tokenizer::{get_tokenizer, Tokenizer};

pub use tools::{
    BudgetedConfig, ConstructedTools, ConstructionRequest, ImageCredentialResolver, TokenBudget,
    ToolConstructor, ToolError, ToolResult, ToolServices,
};

pub use api::{SearchEndpoint, SearchToolRequest, SearchToolResponse};
