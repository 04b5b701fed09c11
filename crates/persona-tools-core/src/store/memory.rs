//! In-memory persistence

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::traits::{BuiltinToolRecord, Persistence, StoreError, StoreResult};
use crate::types::{CapabilityKind, LlmProviderRecord, Persona};

/// In-memory persistence for tests and embedded use
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    personas: RwLock<HashMap<i64, Persona>>,
    builtin_tools: RwLock<Vec<BuiltinToolRecord>>,
    llm_providers: RwLock<Vec<LlmProviderRecord>>,
    provider_reads: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with every built-in capability registered
    pub fn with_default_builtin_tools() -> Self {
        let store = Self::new();
        for kind in CapabilityKind::BUILT_IN {
            if let Some(id) = kind.in_code_tool_id() {
                store.add_builtin_tool(BuiltinToolRecord::new(id, kind.to_string()));
            }
        }
        store
    }

    pub fn add_persona(&self, persona: Persona) {
        self.personas.write().insert(persona.id, persona);
    }

    pub fn add_builtin_tool(&self, record: BuiltinToolRecord) {
        let mut tools = self.builtin_tools.write();
        tools.retain(|t| t.in_code_tool_id != record.in_code_tool_id);
        tools.push(record);
    }

    pub fn add_llm_provider(&self, record: LlmProviderRecord) {
        self.llm_providers.write().push(record);
    }

    /// Number of `list_llm_providers` calls served so far
    pub fn provider_reads(&self) -> usize {
        self.provider_reads.load(Ordering::SeqCst)
    }
}

impl Persistence for MemoryPersistence {
    fn get_persona(&self, id: i64) -> StoreResult<Persona> {
        self.personas
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Persona", id))
    }

    fn builtin_tool(&self, in_code_tool_id: &str) -> StoreResult<Option<BuiltinToolRecord>> {
        Ok(self
            .builtin_tools
            .read()
            .iter()
            .find(|t| t.in_code_tool_id == in_code_tool_id)
            .cloned())
    }

    fn list_llm_providers(&self) -> StoreResult<Vec<LlmProviderRecord>> {
        self.provider_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.llm_providers.read().clone())
    }
}
