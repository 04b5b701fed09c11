//! Capability registry
//!
//! Maps a built-in tool identifier to a [`CapabilityKind`]. The set of
//! registered identifiers lives in persistence; the kinds themselves are a
//! closed enum, so new built-ins are added in one place.

use crate::store::Persistence;
use crate::types::CapabilityKind;

use super::error::{ToolError, ToolResult};

/// Resolve a built-in tool id against the persisted registry
pub fn resolve_capability(store: &dyn Persistence, in_code_tool_id: &str) -> ToolResult<CapabilityKind> {
    let record = store
        .builtin_tool(in_code_tool_id)?
        .ok_or_else(|| ToolError::NotFound(in_code_tool_id.to_string()))?;

    CapabilityKind::from_in_code_tool_id(&record.in_code_tool_id)
        .ok_or_else(|| ToolError::NotFound(record.in_code_tool_id.clone()))
}
