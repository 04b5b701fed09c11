//! Tool construction module
//!
//! Resolves a persona's tool declarations into callable tools for one turn.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ToolConstructor::construct_tools            │
//! │                                              │
//! │  for each ToolDeclaration:                   │
//! │    built-in id ──► registry ──► kind         │
//! │       Search          → SearchTool           │
//! │       ImageGeneration → credential chain     │
//! │                         → ImageGenerationTool│
//! │       InternetSearch  → InternetSearchTool   │
//! │    OpenAPI schema ──► CustomTool per op      │
//! └──────────────────────────────────────────────┘
//!           │ all tools
//!           ▼
//! ┌──────────────────────────────────────────────┐
//! │  TokenBudget (once)                          │
//! │    → BudgetedConfig<SearchToolConfig>        │
//! │    → BudgetedConfig<InternetSearchToolConfig>│
//! └──────────────────────────────────────────────┘
//! ```

mod budget;
mod constructor;
mod credentials;
mod custom;
mod error;
mod image_generation;
mod internet_search;
mod registry;
mod search;

pub use budget::{
    compute_all_tool_tokens, explicit_tool_calling_supported, BudgetedConfig, TokenBudget,
};
pub use constructor::{
    ConstructedTools, ConstructionRequest, DeclarationFailure, ToolConstructor, ToolServices,
    INTERNET_SEARCH_KEY_GUIDANCE,
};
pub use credentials::{
    AzureDeployment, CredentialContext, CredentialStrategy, ImageCredentialResolver,
    PersistedOpenAiProvider, PrimaryModelKey, ResolvedImageCredentials, AZURE_DALLE_SECRET,
};
pub use custom::{
    build_custom_tools, merge_headers, openapi_operations, server_url, substitute_placeholders,
    validate_openapi_schema, CustomTool, DynamicSchemaInfo, Operation, OperationParameter,
    ParameterLocation, CHAT_SESSION_ID_PLACEHOLDER, MESSAGE_ID_PLACEHOLDER, REQUEST_BODY,
};
pub use error::{ToolError, ToolResult};
pub use image_generation::{ImageGenerationTool, ImageShape, IMAGE_GENERATION_TOOL_NAME};
pub use internet_search::{
    InternetSearchProvider, InternetSearchProviderKind, InternetSearchTool,
    InternetSearchToolParams, WebSearchClient, INTERNET_SEARCH_NUM_RESULTS,
    INTERNET_SEARCH_TOOL_NAME,
};
pub use registry::resolve_capability;
pub use search::{
    DocumentRetriever, SearchRequest, SearchTool, SearchToolParams, FINAL_CONTEXT_DOCUMENTS_ID,
    SEARCH_TOOL_NAME,
};
