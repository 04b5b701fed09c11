//! Persistence collaborator trait

use serde::{Deserialize, Serialize};

use crate::types::{LlmProviderRecord, Persona};

/// A registered built-in tool row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinToolRecord {
    pub in_code_tool_id: String,
    pub display_name: String,
}

impl BuiltinToolRecord {
    pub fn new(in_code_tool_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            in_code_tool_id: in_code_tool_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Errors raised by the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Persistence error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only view of the database session used during one construction pass
///
/// Implementations:
/// - `MemoryPersistence`: In-memory for tests and embedding
/// - Host adapters: wrap the service's own database session
pub trait Persistence: Send + Sync {
    fn get_persona(&self, id: i64) -> StoreResult<Persona>;

    /// Look up a registered built-in tool by its in-code identifier
    fn builtin_tool(&self, in_code_tool_id: &str) -> StoreResult<Option<BuiltinToolRecord>>;

    fn list_llm_providers(&self) -> StoreResult<Vec<LlmProviderRecord>>;
}
