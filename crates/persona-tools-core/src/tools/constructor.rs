//! Tool construction
//!
//! One pass over a persona's declarations. Built-in references go through
//! the capability registry to the matching tool; OpenAPI declarations go
//! through the custom tool builder. The token budget is computed once, after
//! every tool exists, and attached to the search and internet search configs.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::{
    AppConfig, FailurePolicy, InternetSearchToolConfig, SearchToolConfig, ToolConfigs,
};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::secrets::SecretStore;
use crate::store::Persistence;
use crate::types::{
    CapabilityKind, DeclarationSource, Llm, OptionalSearchSetting, Persona, PromptConfig, Tool,
    ToolDeclaration, ToolId, User,
};
use crate::{log_debug, log_error, log_info, log_warn};

use super::budget::{BudgetedConfig, TokenBudget};
use super::credentials::{CredentialContext, ImageCredentialResolver};
use super::custom::{build_custom_tools, merge_headers, DynamicSchemaInfo};
use super::error::{ToolError, ToolResult};
use super::image_generation::ImageGenerationTool;
use super::internet_search::{
    InternetSearchTool, InternetSearchToolParams, WebSearchClient, INTERNET_SEARCH_NUM_RESULTS,
};
use super::registry::resolve_capability;
use super::search::{DocumentRetriever, SearchTool, SearchToolParams};

/// Shown to the user when no internet search provider key is configured
pub const INTERNET_SEARCH_KEY_GUIDANCE: &str =
    "Internet search tool requires a Bing or Exa API key, please contact your workspace admin to get it added!";

/// Backends handed to the tools that need them
#[derive(Clone)]
pub struct ToolServices {
    pub retriever: Arc<dyn DocumentRetriever>,
    pub web_search: Arc<dyn WebSearchClient>,
    pub http: reqwest::Client,
}

/// Inputs of one construction call
///
/// The persistence handle is borrowed for the duration of the call.
#[derive(Clone)]
pub struct ConstructionRequest<'a> {
    pub persona: Arc<Persona>,
    pub prompt_config: Arc<PromptConfig>,
    pub store: &'a dyn Persistence,
    pub user: Option<Arc<User>>,
    pub llm: Arc<dyn Llm>,
    pub fast_llm: Arc<dyn Llm>,
    pub search_setting: OptionalSearchSetting,
}

/// A declaration that failed while the isolate policy was active
#[derive(Debug)]
pub struct DeclarationFailure {
    pub declaration_id: ToolId,
    pub error: ToolError,
}

/// Result of a construction call
#[derive(Debug, Default)]
pub struct ConstructedTools {
    /// Declaration id to the tools built for it; never holds an empty list
    pub tools: BTreeMap<ToolId, Vec<Arc<dyn Tool>>>,
    pub search_config: Option<BudgetedConfig<SearchToolConfig>>,
    pub internet_search_config: Option<BudgetedConfig<InternetSearchToolConfig>>,
    pub failures: Vec<DeclarationFailure>,
}

impl ConstructedTools {
    pub fn get(&self, id: ToolId) -> Option<&[Arc<dyn Tool>]> {
        self.tools.get(&id).map(Vec::as_slice)
    }

    pub fn declaration_ids(&self) -> Vec<ToolId> {
        self.tools.keys().copied().collect()
    }

    /// Every tool, in declaration id order
    pub fn all_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().flatten().cloned().collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.values().map(Vec::len).sum()
    }
}

/// Builds runtime tools for a persona
pub struct ToolConstructor {
    settings: AppConfig,
    secrets: Arc<dyn SecretStore>,
    services: ToolServices,
    credential_resolver: ImageCredentialResolver,
    logger: SharedLogger,
}

impl ToolConstructor {
    pub fn new(settings: AppConfig, secrets: Arc<dyn SecretStore>, services: ToolServices) -> Self {
        Self {
            settings,
            secrets,
            services,
            credential_resolver: ImageCredentialResolver::default(),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_credential_resolver(mut self, resolver: ImageCredentialResolver) -> Self {
        self.credential_resolver = resolver;
        self
    }

    pub fn settings(&self) -> &AppConfig {
        &self.settings
    }

    pub fn credential_resolver(&self) -> &ImageCredentialResolver {
        &self.credential_resolver
    }

    /// Build every declared tool and the budgeted configs
    ///
    /// With [`FailurePolicy::Abort`] the first failing declaration ends the
    /// call. With [`FailurePolicy::Isolate`] failures are collected and the
    /// other declarations are still built.
    pub fn construct_tools(
        &self,
        request: &ConstructionRequest<'_>,
        mut configs: ToolConfigs,
    ) -> ToolResult<ConstructedTools> {
        let mut tools: BTreeMap<ToolId, Vec<Arc<dyn Tool>>> = BTreeMap::new();
        let mut failures = Vec::new();

        for declaration in &request.persona.tools {
            log_debug!(
                self.logger,
                "Building tool declaration {} ({})",
                declaration.id,
                declaration.name
            );
            match self.build_declaration(declaration, request, &mut configs) {
                Ok(built) if built.is_empty() => {}
                Ok(built) => tools.entry(declaration.id).or_default().extend(built),
                Err(error) => match self.settings.failure_policy {
                    FailurePolicy::Abort => return Err(error),
                    FailurePolicy::Isolate => {
                        log_warn!(
                            self.logger,
                            "Skipping tool declaration {}: {}",
                            declaration.id,
                            error
                        );
                        failures.push(DeclarationFailure {
                            declaration_id: declaration.id,
                            error,
                        });
                    }
                },
            }
        }

        let mut constructed = ConstructedTools {
            tools,
            failures,
            ..Default::default()
        };

        if configs.search.is_some() || configs.internet_search.is_some() {
            let budget = self.compute_budget(request.llm.as_ref(), &constructed.all_tools());
            constructed.search_config = configs.search.map(|c| BudgetedConfig::new(c, budget));
            constructed.internet_search_config =
                configs.internet_search.map(|c| BudgetedConfig::new(c, budget));
        }

        Ok(constructed)
    }

    fn compute_budget(&self, llm: &dyn Llm, tools: &[Arc<dyn Tool>]) -> TokenBudget {
        let config = llm.config();
        let budget = TokenBudget::compute(
            tools,
            llm.tokenizer().as_ref(),
            &config.model_provider,
            &config.model_name,
        );
        log_debug!(
            self.logger,
            "Tool definitions take {} tokens (native tool calling: {})",
            budget.tool_definition_tokens,
            budget.uses_native_tool_calling
        );
        budget
    }

    fn build_declaration(
        &self,
        declaration: &ToolDeclaration,
        request: &ConstructionRequest<'_>,
        configs: &mut ToolConfigs,
    ) -> ToolResult<Vec<Arc<dyn Tool>>> {
        match declaration.source()? {
            DeclarationSource::BuiltIn(id) => {
                let kind = resolve_capability(request.store, id)?;
                self.build_builtin(kind, request, configs)
            }
            DeclarationSource::Schema(schema) => {
                self.build_custom(declaration, schema, request, configs)
            }
        }
    }

    fn build_builtin(
        &self,
        kind: CapabilityKind,
        request: &ConstructionRequest<'_>,
        configs: &mut ToolConfigs,
    ) -> ToolResult<Vec<Arc<dyn Tool>>> {
        let tool: Arc<dyn Tool> = match kind {
            CapabilityKind::Search => {
                if request.search_setting == OptionalSearchSetting::Never {
                    log_debug!(self.logger, "Search disabled for this request");
                    return Ok(Vec::new());
                }
                Arc::new(SearchTool::new(SearchToolParams {
                    persona: request.persona.clone(),
                    prompt_config: request.prompt_config.clone(),
                    user: request.user.clone(),
                    llm: request.llm.clone(),
                    fast_llm: request.fast_llm.clone(),
                    config: configs.search_config().clone(),
                    evaluation_type: SearchTool::evaluation_type_for(&request.persona),
                    retriever: self.services.retriever.clone(),
                }))
            }
            CapabilityKind::ImageGeneration => {
                let ctx = CredentialContext {
                    llm: request.llm.config(),
                    store: request.store,
                    secrets: self.secrets.as_ref(),
                    settings: &self.settings.image_generation,
                };
                let resolved = self.credential_resolver.resolve(&ctx)?;
                log_info!(
                    self.logger,
                    "Image generation credentials from {} ({})",
                    resolved.strategy,
                    resolved.config.model_name
                );
                let headers = configs.image_generation_config().additional_headers.clone();
                Arc::new(ImageGenerationTool::new(
                    resolved.config,
                    headers,
                    self.services.http.clone(),
                )?)
            }
            CapabilityKind::InternetSearch => {
                let params = InternetSearchToolParams {
                    persona: request.persona.clone(),
                    prompt_config: request.prompt_config.clone(),
                    llm: request.llm.clone(),
                    config: configs.internet_search_config().clone(),
                    provider: None,
                    num_results: INTERNET_SEARCH_NUM_RESULTS,
                    client: self.services.web_search.clone(),
                };
                let tool = InternetSearchTool::new(params, self.secrets.as_ref()).map_err(|e| match e {
                    ToolError::MissingProviderKey(tried) => {
                        log_error!(
                            self.logger,
                            "Could not build internet search tool, no key for: {}",
                            tried
                        );
                        ToolError::configuration(INTERNET_SEARCH_KEY_GUIDANCE)
                    }
                    other => other,
                })?;
                Arc::new(tool)
            }
            CapabilityKind::Custom => {
                return Err(ToolError::NotFound(kind.to_string()));
            }
        };
        Ok(vec![tool])
    }

    fn build_custom(
        &self,
        declaration: &ToolDeclaration,
        schema: &Value,
        request: &ConstructionRequest<'_>,
        configs: &mut ToolConfigs,
    ) -> ToolResult<Vec<Arc<dyn Tool>>> {
        let config = configs.custom_config();
        let dynamic = DynamicSchemaInfo::from(config);

        let oauth_token = if declaration.passthrough_auth {
            request.user.as_deref().and_then(User::oauth_token)
        } else {
            None
        };
        let headers = merge_headers(
            &declaration.custom_headers,
            &config.additional_headers,
            oauth_token,
            &self.logger,
        );

        Ok(build_custom_tools(schema, &dynamic, headers, &self.services.http)?
            .into_iter()
            .map(|tool| Arc::new(tool) as Arc<dyn Tool>)
            .collect())
    }
}

impl std::fmt::Debug for ToolConstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolConstructor")
            .field("settings", &self.settings)
            .field("secrets", &self.secrets.name())
            .field("credential_resolver", &self.credential_resolver)
            .finish()
    }
}
