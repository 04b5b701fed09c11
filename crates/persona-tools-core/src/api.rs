//! Search-only request surface
//!
//! Runs the search tool for the default persona and flattens the final
//! documents into a prompt-ready string. Failures never reach the caller;
//! they are logged and answered with empty results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SearchToolConfig;
use crate::logging::SharedLogger;
use crate::store::Persistence;
use crate::tools::{
    DocumentRetriever, SearchTool, SearchToolParams, ToolError, ToolResult,
    FINAL_CONTEXT_DOCUMENTS_ID,
};
use crate::types::{ContextDocument, Llm, LlmEvaluationType, MetadataValue};
use crate::{log_error, log_info, log_warn};

/// Persona the endpoint searches with
pub const DEFAULT_PERSONA_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchToolRequest {
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchToolResponse {
    pub results: String,
}

/// Handles ad-hoc search requests from integration surfaces
pub struct SearchEndpoint {
    store: Arc<dyn Persistence>,
    llm: Arc<dyn Llm>,
    fast_llm: Arc<dyn Llm>,
    retriever: Arc<dyn DocumentRetriever>,
    logger: SharedLogger,
}

impl SearchEndpoint {
    pub fn new(
        store: Arc<dyn Persistence>,
        llm: Arc<dyn Llm>,
        fast_llm: Arc<dyn Llm>,
        retriever: Arc<dyn DocumentRetriever>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            store,
            llm,
            fast_llm,
            retriever,
            logger,
        }
    }

    pub async fn handle(&self, request: SearchToolRequest) -> SearchToolResponse {
        log_info!(self.logger, "Received search request with query: {}", request.query);

        match self.run(&request.query).await {
            Ok(Some(results)) => SearchToolResponse { results },
            Ok(None) => {
                log_warn!(self.logger, "No final context documents found in search results");
                SearchToolResponse::default()
            }
            Err(e) => {
                log_error!(self.logger, "Error running search tool: {}", e);
                SearchToolResponse::default()
            }
        }
    }

    async fn run(&self, query: &str) -> ToolResult<Option<String>> {
        let persona = self.store.get_persona(DEFAULT_PERSONA_ID)?;
        let prompt_config = persona.prompts.first().cloned().ok_or_else(|| {
            ToolError::configuration(format!("Persona {} has no prompt", DEFAULT_PERSONA_ID))
        })?;

        let tool = SearchTool::new(SearchToolParams {
            persona: Arc::new(persona),
            prompt_config: Arc::new(prompt_config),
            user: None,
            llm: self.llm.clone(),
            fast_llm: self.fast_llm.clone(),
            config: SearchToolConfig::default(),
            evaluation_type: LlmEvaluationType::Skip,
            retriever: self.retriever.clone(),
        });

        let Some(final_docs) = tool
            .search(query)
            .await?
            .into_iter()
            .find(|r| r.id == FINAL_CONTEXT_DOCUMENTS_ID)
        else {
            return Ok(None);
        };

        let mut documents: Vec<ContextDocument> = serde_json::from_value(final_docs.response)?;
        for doc in &mut documents {
            if let Some(link) = &doc.link {
                doc.metadata
                    .insert("link".to_string(), MetadataValue::Single(link.clone()));
            }
        }
        Ok(Some(build_complete_context_str(&documents)))
    }
}

/// `google_drive` → `Google Drive`
fn display_source(source_type: &str) -> String {
    source_type
        .split('_')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Render one document as a context block
pub fn build_doc_context_str(doc: &ContextDocument, index: usize) -> String {
    let mut out = format!("DOCUMENT {}: {}\n", index, doc.semantic_identifier);
    out.push_str(&format!("Source: {}\n", display_source(&doc.source_type)));
    for (key, value) in &doc.metadata {
        out.push_str(&format!("{}: {}\n", capitalize(key), value));
    }
    if let Some(updated_at) = &doc.updated_at {
        out.push_str(&format!("Updated: {}\n", updated_at));
    }
    out.push_str(&format!("```\n{}\n```\n\n\n", doc.content.trim()));
    out
}

/// Render documents as numbered context blocks, starting at 1
pub fn build_complete_context_str(documents: &[ContextDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| build_doc_context_str(doc, i + 1))
        .collect::<String>()
        .trim()
        .to_string()
}
