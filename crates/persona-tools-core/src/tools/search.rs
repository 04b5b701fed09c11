//! Internal document search tool

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{AnswerStyleConfig, DocumentPruningConfig, SearchToolConfig};
use crate::types::{
    CapabilityKind, ContextDocument, Llm, LlmEvaluationType, Persona, PromptConfig,
    RerankingDetails, RetrievalDetails, Tool, ToolDefinition, ToolResponse, User,
};

use super::error::{ToolError, ToolResult};

pub const SEARCH_TOOL_NAME: &str = "run_search";
pub const SEARCH_TOOL_DESCRIPTION: &str = "Runs a semantic search over the user's knowledge base. \
The default behavior is to use this tool. The only scenario where you should not use this tool \
is if the question can be answered from the chat history or is purely conversational.";

/// Response id of the retrieval summary packet
pub const SEARCH_RESPONSE_SUMMARY_ID: &str = "search_response_summary";
/// Response id of the documents handed to the model
pub const FINAL_CONTEXT_DOCUMENTS_ID: &str = "final_context_documents";

/// Query plus everything the retriever needs to honour persona settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub persona_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub retrieval_options: RetrievalDetails,
    pub evaluation_type: LlmEvaluationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_settings: Option<RerankingDetails>,
    pub chunks_above: usize,
    pub chunks_below: usize,
    pub full_doc: bool,
    pub bypass_acl: bool,
}

/// Document retrieval backend
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn retrieve(&self, request: &SearchRequest) -> ToolResult<Vec<ContextDocument>>;
}

/// Everything a search tool is built from
pub struct SearchToolParams {
    pub persona: Arc<Persona>,
    pub prompt_config: Arc<PromptConfig>,
    pub user: Option<Arc<User>>,
    pub llm: Arc<dyn Llm>,
    pub fast_llm: Arc<dyn Llm>,
    pub config: SearchToolConfig,
    pub evaluation_type: LlmEvaluationType,
    pub retriever: Arc<dyn DocumentRetriever>,
}

/// Searches the knowledge base available to the persona
pub struct SearchTool {
    persona: Arc<Persona>,
    prompt_config: Arc<PromptConfig>,
    user: Option<Arc<User>>,
    llm: Arc<dyn Llm>,
    fast_llm: Arc<dyn Llm>,
    config: SearchToolConfig,
    evaluation_type: LlmEvaluationType,
    retriever: Arc<dyn DocumentRetriever>,
}

impl SearchTool {
    pub fn new(params: SearchToolParams) -> Self {
        Self {
            persona: params.persona,
            prompt_config: params.prompt_config,
            user: params.user,
            llm: params.llm,
            fast_llm: params.fast_llm,
            config: params.config,
            evaluation_type: params.evaluation_type,
            retriever: params.retriever,
        }
    }

    /// Evaluation type implied by the persona's relevance filter flag
    pub fn evaluation_type_for(persona: &Persona) -> LlmEvaluationType {
        if persona.llm_relevance_filter {
            LlmEvaluationType::Basic
        } else {
            LlmEvaluationType::Skip
        }
    }

    pub fn evaluation_type(&self) -> LlmEvaluationType {
        self.evaluation_type
    }

    pub fn pruning_config(&self) -> &DocumentPruningConfig {
        &self.config.document_pruning_config
    }

    pub fn answer_style_config(&self) -> &AnswerStyleConfig {
        &self.config.answer_style_config
    }

    pub fn prompt_config(&self) -> &PromptConfig {
        &self.prompt_config
    }

    /// Names of the primary and fast models this tool was built with
    pub fn model_names(&self) -> (&str, &str) {
        (self.llm.config().model_name.as_str(), self.fast_llm.config().model_name.as_str())
    }

    fn request_for(&self, query: String) -> SearchRequest {
        SearchRequest {
            query,
            persona_id: self.persona.id,
            user_id: self.user.as_ref().map(|u| u.id.clone()),
            retrieval_options: self.config.retrieval_options.clone(),
            evaluation_type: self.evaluation_type,
            rerank_settings: self.config.rerank_settings.clone(),
            chunks_above: self.config.chunks_above,
            chunks_below: self.config.chunks_below,
            full_doc: self.config.full_doc,
            bypass_acl: self.config.bypass_acl,
        }
    }

    /// Run a search for a plain query string
    pub async fn search(&self, query: &str) -> ToolResult<Vec<ToolResponse>> {
        let (documents, retrieved) = match &self.config.selected_sections {
            Some(sections) => (sections.clone(), false),
            None => (self.retriever.retrieve(&self.request_for(query.to_string())).await?, true),
        };

        let summary = json!({
            "query": query,
            "num_documents": documents.len(),
            "retrieved": retrieved,
        });
        Ok(vec![
            ToolResponse::new(SEARCH_RESPONSE_SUMMARY_ID, summary),
            ToolResponse::new(FINAL_CONTEXT_DOCUMENTS_ID, serde_json::to_value(&documents)?),
        ])
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        SEARCH_TOOL_DESCRIPTION
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Search
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SEARCH_TOOL_NAME,
            SEARCH_TOOL_DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn run(&self, args: Value) -> ToolResult<Vec<ToolResponse>> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid_arguments(SEARCH_TOOL_NAME, "missing string field `query`"))?;
        self.search(query).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{LlmConfig, StaticLlm};
    use parking_lot::Mutex;

    /// Retriever returning canned documents and remembering requests
    #[derive(Default)]
    pub(crate) struct FakeRetriever {
        pub documents: Vec<ContextDocument>,
        pub fail: bool,
        pub requests: Mutex<Vec<SearchRequest>>,
    }

    #[async_trait]
    impl DocumentRetriever for FakeRetriever {
        async fn retrieve(&self, request: &SearchRequest) -> ToolResult<Vec<ContextDocument>> {
            self.requests.lock().push(request.clone());
            if self.fail {
                return Err(ToolError::Backend("index unavailable".to_string()));
            }
            Ok(self.documents.clone())
        }
    }

    fn tool(config: SearchToolConfig, retriever: Arc<FakeRetriever>, persona: Persona) -> SearchTool {
        let llm = StaticLlm::shared(LlmConfig::new("openai", "gpt-4o", 128_000));
        let fast = StaticLlm::shared(LlmConfig::new("openai", "gpt-4o-mini", 128_000));
        SearchTool::new(SearchToolParams {
            evaluation_type: SearchTool::evaluation_type_for(&persona),
            persona: Arc::new(persona),
            prompt_config: Arc::new(PromptConfig::default()),
            user: Some(Arc::new(User::new("u1", "u1@example.com"))),
            llm,
            fast_llm: fast,
            config,
            retriever,
        })
    }

    #[tokio::test]
    async fn test_run_retrieves_documents() {
        let retriever = Arc::new(FakeRetriever {
            documents: vec![ContextDocument::new("d1", "Doc One", "web", "hello")],
            ..Default::default()
        });
        let persona = Persona::new(3, "Research").with_relevance_filter(true);
        let search = tool(SearchToolConfig { chunks_above: 1, ..Default::default() }, retriever.clone(), persona);

        let responses = search.run(json!({"query": "hello"})).await.unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1].id, FINAL_CONTEXT_DOCUMENTS_ID);
        let docs: Vec<ContextDocument> = serde_json::from_value(responses[1].response.clone()).unwrap();
        assert_eq!(docs[0].document_id, "d1");

        let requests = retriever.requests.lock();
        assert_eq!(requests[0].persona_id, 3);
        assert_eq!(requests[0].chunks_above, 1);
        assert_eq!(requests[0].evaluation_type, LlmEvaluationType::Basic);
        assert_eq!(requests[0].user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_selected_sections_skip_retrieval() {
        let retriever = Arc::new(FakeRetriever::default());
        let config = SearchToolConfig {
            selected_sections: Some(vec![ContextDocument::new("s1", "Picked", "file", "text")]),
            ..Default::default()
        };
        let search = tool(config, retriever.clone(), Persona::new(1, "p"));

        let responses = search.search("anything").await.unwrap();
        assert_eq!(responses[0].response["retrieved"], false);
        assert!(retriever.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_query_argument() {
        let search = tool(SearchToolConfig::default(), Arc::new(FakeRetriever::default()), Persona::new(1, "p"));
        assert!(matches!(
            search.run(json!({})).await,
            Err(ToolError::InvalidArguments { .. })
        ));
        assert_eq!(search.evaluation_type(), LlmEvaluationType::Skip);
        assert_eq!(search.model_names(), ("gpt-4o", "gpt-4o-mini"));
    }
}
