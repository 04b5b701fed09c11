//! Retrieval settings and retrieved documents

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Caller override for whether search runs this turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionalSearchSetting {
    Always,
    Never,
    #[default]
    Auto,
}

/// How retrieved documents are checked for relevance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmEvaluationType {
    /// LLM relevance filter runs on retrieved sections
    Basic,
    #[default]
    Skip,
}

/// Retrieval knobs passed through to the document retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalDetails {
    #[serde(default)]
    pub run_search: OptionalSearchSetting,
    #[serde(default = "default_true")]
    pub real_time: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_auto_detect_filters: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub dedupe_docs: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RetrievalDetails {
    fn default() -> Self {
        Self {
            run_search: OptionalSearchSetting::Auto,
            real_time: true,
            enable_auto_detect_filters: None,
            offset: None,
            limit: None,
            dedupe_docs: false,
        }
    }
}

/// Reranking model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankingDetails {
    pub rerank_model_name: Option<String>,
    pub rerank_provider_type: Option<String>,
    pub num_rerank: usize,
}

/// Metadata value attached to a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Single(String),
    List(Vec<String>),
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Single(v) => write!(f, "{}", v),
            MetadataValue::List(vs) => write!(f, "{}", vs.join(", ")),
        }
    }
}

/// A document (or section of one) selected as context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    pub document_id: String,
    pub semantic_identifier: String,
    pub content: String,
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
    /// Already formatted for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ContextDocument {
    pub fn new(
        document_id: impl Into<String>,
        semantic_identifier: impl Into<String>,
        source_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            semantic_identifier: semantic_identifier.into(),
            content: content.into(),
            source_type: source_type.into(),
            link: None,
            metadata: BTreeMap::new(),
            updated_at: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }
}
