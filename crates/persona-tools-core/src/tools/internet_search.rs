//! Internet search tool

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{AnswerStyleConfig, DocumentPruningConfig, InternetSearchToolConfig};
use crate::secrets::SecretStore;
use crate::types::{
    CapabilityKind, ContextDocument, Llm, Persona, PromptConfig, Tool, ToolDefinition,
    ToolResponse,
};

use super::error::{ToolError, ToolResult};
use super::search::FINAL_CONTEXT_DOCUMENTS_ID;

pub const INTERNET_SEARCH_TOOL_NAME: &str = "run_internet_search";
pub const INTERNET_SEARCH_TOOL_DESCRIPTION: &str =
    "Perform an internet search for up-to-date information.";
pub const INTERNET_SEARCH_RESULTS_ID: &str = "internet_search_results";
/// Results requested per search
pub const INTERNET_SEARCH_NUM_RESULTS: usize = 10;

/// Supported web search backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InternetSearchProviderKind {
    Exa,
    Bing,
}

impl InternetSearchProviderKind {
    /// Tried in this order when no provider is requested
    pub const DEFAULT_ORDER: [InternetSearchProviderKind; 2] =
        [InternetSearchProviderKind::Exa, InternetSearchProviderKind::Bing];

    /// Secret store key holding the API key
    pub fn secret_key(&self) -> &'static str {
        match self {
            InternetSearchProviderKind::Exa => "exa",
            InternetSearchProviderKind::Bing => "bing",
        }
    }
}

/// A provider with its API key
#[derive(Clone)]
pub struct InternetSearchProvider {
    pub kind: InternetSearchProviderKind,
    pub api_key: String,
}

impl InternetSearchProvider {
    /// Pick a provider that has a key, honouring an explicit preference
    pub fn resolve(
        secrets: &dyn SecretStore,
        preferred: Option<InternetSearchProviderKind>,
    ) -> ToolResult<Self> {
        let candidates: Vec<InternetSearchProviderKind> = match preferred {
            Some(kind) => vec![kind],
            None => InternetSearchProviderKind::DEFAULT_ORDER.to_vec(),
        };

        candidates
            .iter()
            .find_map(|kind| {
                secrets.get(kind.secret_key()).map(|api_key| Self {
                    kind: *kind,
                    api_key,
                })
            })
            .ok_or_else(|| {
                let tried: Vec<&str> = candidates.iter().map(|k| k.secret_key()).collect();
                ToolError::MissingProviderKey(tried.join(", "))
            })
    }
}

impl std::fmt::Debug for InternetSearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternetSearchProvider")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Web search backend
#[async_trait]
pub trait WebSearchClient: Send + Sync {
    async fn search(
        &self,
        provider: &InternetSearchProvider,
        query: &str,
        num_results: usize,
    ) -> ToolResult<Vec<ContextDocument>>;
}

/// Everything an internet search tool is built from
pub struct InternetSearchToolParams {
    pub persona: Arc<Persona>,
    pub prompt_config: Arc<PromptConfig>,
    pub llm: Arc<dyn Llm>,
    pub config: InternetSearchToolConfig,
    /// `None` picks the first provider with a key
    pub provider: Option<InternetSearchProviderKind>,
    pub num_results: usize,
    pub client: Arc<dyn WebSearchClient>,
}

/// Searches the public web through a configured provider
pub struct InternetSearchTool {
    persona: Arc<Persona>,
    prompt_config: Arc<PromptConfig>,
    llm: Arc<dyn Llm>,
    config: InternetSearchToolConfig,
    provider: InternetSearchProvider,
    num_results: usize,
    client: Arc<dyn WebSearchClient>,
}

impl InternetSearchTool {
    /// Fails with `MissingProviderKey` when no provider key is available
    pub fn new(params: InternetSearchToolParams, secrets: &dyn SecretStore) -> ToolResult<Self> {
        let provider = InternetSearchProvider::resolve(secrets, params.provider)?;
        Ok(Self {
            persona: params.persona,
            prompt_config: params.prompt_config,
            llm: params.llm,
            config: params.config,
            provider,
            num_results: params.num_results,
            client: params.client,
        })
    }

    pub fn provider_kind(&self) -> InternetSearchProviderKind {
        self.provider.kind
    }

    pub fn num_results(&self) -> usize {
        self.num_results
    }

    pub fn pruning_config(&self) -> &DocumentPruningConfig {
        &self.config.document_pruning_config
    }

    pub fn answer_style_config(&self) -> &AnswerStyleConfig {
        &self.config.answer_style_config
    }

    pub fn persona_id(&self) -> i64 {
        self.persona.id
    }

    pub fn prompt_config(&self) -> &PromptConfig {
        &self.prompt_config
    }

    pub fn model_name(&self) -> &str {
        &self.llm.config().model_name
    }
}

#[async_trait]
impl Tool for InternetSearchTool {
    fn name(&self) -> &str {
        INTERNET_SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        INTERNET_SEARCH_TOOL_DESCRIPTION
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::InternetSearch
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            INTERNET_SEARCH_TOOL_NAME,
            INTERNET_SEARCH_TOOL_DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "internet_search_query": {
                        "type": "string",
                        "description": "Query to search on the internet"
                    }
                },
                "required": ["internet_search_query"]
            }),
        )
    }

    async fn run(&self, args: Value) -> ToolResult<Vec<ToolResponse>> {
        let query = args
            .get("internet_search_query")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolError::invalid_arguments(
                    INTERNET_SEARCH_TOOL_NAME,
                    "missing string field `internet_search_query`",
                )
            })?;

        let documents = self
            .client
            .search(&self.provider, query, self.num_results)
            .await?;
        let documents = serde_json::to_value(&documents)?;

        Ok(vec![
            ToolResponse::new(
                INTERNET_SEARCH_RESULTS_ID,
                json!({ "query": query, "provider": self.provider.kind }),
            ),
            ToolResponse::new(FINAL_CONTEXT_DOCUMENTS_ID, documents),
        ])
    }
}
