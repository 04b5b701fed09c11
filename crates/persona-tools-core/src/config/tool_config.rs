//! Per-kind tool configuration
//!
//! Each kind has a config struct with kind-specific defaults. Callers may
//! supply any of them; `ToolConfigs` fills in the rest on first use. Once
//! built, a config is not modified again: the token budget is attached
//! separately (see `tools::budget`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ContextDocument, RerankingDetails, RetrievalDetails};

/// Citation behaviour for search-like tools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationConfig {
    /// Treat every returned document as useful when citing
    #[serde(default)]
    pub all_docs_useful: bool,
}

/// Answer formatting preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerStyleConfig {
    pub citation_config: CitationConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_response_format: Option<serde_json::Value>,
}

impl AnswerStyleConfig {
    pub fn citations(all_docs_useful: bool) -> Self {
        Self {
            citation_config: CitationConfig { all_docs_useful },
            structured_response_format: None,
        }
    }
}

/// Knobs for the downstream document pruning stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPruningConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_window_percentage: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub is_manually_selected_docs: bool,
    #[serde(default = "default_true")]
    pub use_sections: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DocumentPruningConfig {
    fn default() -> Self {
        Self {
            max_chunks: None,
            max_window_percentage: None,
            max_tokens: None,
            is_manually_selected_docs: false,
            use_sections: true,
        }
    }
}

/// Configs whose kind carries a pruning sub-record
pub trait PrunableConfig {
    fn pruning(&self) -> &DocumentPruningConfig;
}

/// Search tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchToolConfig {
    pub answer_style_config: AnswerStyleConfig,
    pub document_pruning_config: DocumentPruningConfig,
    pub retrieval_options: RetrievalDetails,
    pub rerank_settings: Option<RerankingDetails>,
    /// Sections picked by the user; skips retrieval when set
    pub selected_sections: Option<Vec<ContextDocument>>,
    pub chunks_above: usize,
    pub chunks_below: usize,
    pub full_doc: bool,
    /// Skip document ACLs. Only for bot channels shared by many users.
    pub bypass_acl: bool,
}

impl Default for SearchToolConfig {
    fn default() -> Self {
        Self {
            answer_style_config: AnswerStyleConfig::citations(false),
            document_pruning_config: DocumentPruningConfig::default(),
            retrieval_options: RetrievalDetails::default(),
            rerank_settings: None,
            selected_sections: None,
            chunks_above: 0,
            chunks_below: 0,
            full_doc: false,
            bypass_acl: false,
        }
    }
}

impl PrunableConfig for SearchToolConfig {
    fn pruning(&self) -> &DocumentPruningConfig {
        &self.document_pruning_config
    }
}

/// Internet search tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternetSearchToolConfig {
    pub answer_style_config: AnswerStyleConfig,
    pub document_pruning_config: DocumentPruningConfig,
}

impl Default for InternetSearchToolConfig {
    fn default() -> Self {
        Self {
            answer_style_config: AnswerStyleConfig::citations(true),
            document_pruning_config: DocumentPruningConfig::default(),
        }
    }
}

impl PrunableConfig for InternetSearchToolConfig {
    fn pruning(&self) -> &DocumentPruningConfig {
        &self.document_pruning_config
    }
}

/// Image generation tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageGenerationToolConfig {
    pub additional_headers: BTreeMap<String, String>,
}

/// Custom (OpenAPI) tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomToolConfig {
    pub chat_session_id: Option<Uuid>,
    pub message_id: Option<i64>,
    pub additional_headers: BTreeMap<String, String>,
}

/// Optional caller-supplied configs for one construction pass
///
/// Slots are filled with defaults the first time a declaration of that kind
/// is built. A slot that is still empty at the end means no declaration
/// needed it and the caller did not supply one.
#[derive(Debug, Clone, Default)]
pub struct ToolConfigs {
    pub search: Option<SearchToolConfig>,
    pub internet_search: Option<InternetSearchToolConfig>,
    pub image_generation: Option<ImageGenerationToolConfig>,
    pub custom: Option<CustomToolConfig>,
}

impl ToolConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, config: SearchToolConfig) -> Self {
        self.search = Some(config);
        self
    }

    pub fn with_internet_search(mut self, config: InternetSearchToolConfig) -> Self {
        self.internet_search = Some(config);
        self
    }

    pub fn with_image_generation(mut self, config: ImageGenerationToolConfig) -> Self {
        self.image_generation = Some(config);
        self
    }

    pub fn with_custom(mut self, config: CustomToolConfig) -> Self {
        self.custom = Some(config);
        self
    }

    pub fn search_config(&mut self) -> &SearchToolConfig {
        self.search.get_or_insert_with(SearchToolConfig::default)
    }

    pub fn internet_search_config(&mut self) -> &InternetSearchToolConfig {
        self.internet_search.get_or_insert_with(InternetSearchToolConfig::default)
    }

    pub fn image_generation_config(&mut self) -> &ImageGenerationToolConfig {
        self.image_generation.get_or_insert_with(ImageGenerationToolConfig::default)
    }

    pub fn custom_config(&mut self) -> &CustomToolConfig {
        self.custom.get_or_insert_with(CustomToolConfig::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_specific_defaults() {
        let search = SearchToolConfig::default();
        assert!(!search.answer_style_config.citation_config.all_docs_useful);
        assert_eq!(search.chunks_above, 0);
        assert_eq!(search.chunks_below, 0);
        assert!(!search.bypass_acl);

        let internet = InternetSearchToolConfig::default();
        assert!(internet.answer_style_config.citation_config.all_docs_useful);
    }

    #[test]
    fn test_slots_fill_once_and_keep_supplied_values() {
        let supplied = SearchToolConfig {
            chunks_above: 2,
            ..Default::default()
        };
        let mut configs = ToolConfigs::new().with_search(supplied);

        assert_eq!(configs.search_config().chunks_above, 2);
        assert!(configs.internet_search.is_none());

        configs.internet_search_config();
        assert!(configs.internet_search.is_some());
    }

    #[test]
    fn test_fresh_configs_are_independent() {
        let mut a = ToolConfigs::new();
        let mut b = ToolConfigs::new();
        a.search_config();
        assert!(a.search.is_some());
        assert!(b.search.is_none());
        b.custom_config();
        assert!(a.custom.is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: InternetSearchToolConfig = serde_yaml::from_str("document_pruning_config:\n  max_chunks: 5\n").unwrap();
        assert_eq!(config.document_pruning_config.max_chunks, Some(5));
        assert!(config.answer_style_config.citation_config.all_docs_useful);
    }
}
