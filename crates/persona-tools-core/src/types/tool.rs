//! Tool instance types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::ToolResult;

use super::persona::HeaderItem;

/// Semantic category of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Search,
    ImageGeneration,
    InternetSearch,
    /// Built from an OpenAPI schema rather than a built-in reference
    Custom,
}

impl CapabilityKind {
    /// Built-in kinds, in registry order
    pub const BUILT_IN: [CapabilityKind; 3] = [
        CapabilityKind::Search,
        CapabilityKind::ImageGeneration,
        CapabilityKind::InternetSearch,
    ];

    /// Identifier used by persisted built-in tool rows
    pub fn in_code_tool_id(&self) -> Option<&'static str> {
        match self {
            CapabilityKind::Search => Some("SearchTool"),
            CapabilityKind::ImageGeneration => Some("ImageGenerationTool"),
            CapabilityKind::InternetSearch => Some("InternetSearchTool"),
            CapabilityKind::Custom => None,
        }
    }

    /// Reverse of [`CapabilityKind::in_code_tool_id`]
    pub fn from_in_code_tool_id(id: &str) -> Option<Self> {
        Self::BUILT_IN
            .into_iter()
            .find(|kind| kind.in_code_tool_id() == Some(id))
    }

    /// Whether configs of this kind carry a pruning budget
    pub fn has_pruning_budget(&self) -> bool {
        matches!(self, CapabilityKind::Search | CapabilityKind::InternetSearch)
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityKind::Search => write!(f, "search"),
            CapabilityKind::ImageGeneration => write!(f, "image_generation"),
            CapabilityKind::InternetSearch => write!(f, "internet_search"),
            CapabilityKind::Custom => write!(f, "custom"),
        }
    }
}

/// Function definition shown to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// OpenAI function-calling shape; this is what gets counted for the budget
    pub fn to_function_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// One packet emitted by a tool run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub response: Value,
}

impl ToolResponse {
    pub fn new(id: impl Into<String>, response: Value) -> Self {
        Self {
            id: id.into(),
            response,
        }
    }
}

/// A constructed, callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name exposed to the model
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn kind(&self) -> CapabilityKind;

    fn definition(&self) -> ToolDefinition;

    /// Headers attached to every outgoing call this tool makes
    fn effective_headers(&self) -> &[HeaderItem] {
        &[]
    }

    /// Execute with model-provided arguments
    async fn run(&self, args: Value) -> ToolResult<Vec<ToolResponse>>;
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}
