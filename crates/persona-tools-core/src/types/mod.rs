//! Data shared by the construction pass and the tools it builds

mod llm;
mod persona;
mod search;
mod tool;

pub use llm::{Llm, LlmConfig, LlmProviderRecord, StaticLlm, AZURE_PROVIDER, OPENAI_PROVIDER};
pub use persona::{
    header_map_to_list, DeclarationSource, HeaderItem, OAuthAccount, Persona, PromptConfig,
    ToolDeclaration, ToolId, User,
};
pub use search::{
    ContextDocument, LlmEvaluationType, MetadataValue, OptionalSearchSetting, RerankingDetails,
    RetrievalDetails,
};
pub use tool::{CapabilityKind, Tool, ToolDefinition, ToolResponse};
