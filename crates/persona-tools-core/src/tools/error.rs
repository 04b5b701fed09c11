//! Tool construction and execution errors

use thiserror::Error;

use crate::store::StoreError;
use crate::types::ToolId;

/// Errors raised while building or running tools
#[derive(Error, Debug)]
pub enum ToolError {
    /// Built-in capability id is not registered or not a known kind
    #[error("Built-in tool not found: {0}")]
    NotFound(String),

    /// Missing or invalid credentials for a capability
    #[error("{0}")]
    Configuration(String),

    /// Malformed OpenAPI schema on a custom tool
    #[error("Invalid OpenAPI schema: {0}")]
    Schema(String),

    /// Declaration row breaks the one-source invariant
    #[error("Invalid tool declaration {id}: {reason}")]
    InvalidDeclaration { id: ToolId, reason: String },

    /// No internet search provider key could be found
    #[error("No internet search provider key found: {0}")]
    MissingProviderKey(String),

    /// Tool was called with unusable arguments
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A collaborator failed while a tool was running
    #[error("{0}")]
    Backend(String),
}

impl ToolError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn invalid_declaration(id: ToolId, reason: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            id,
            reason: reason.into(),
        }
    }

    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
