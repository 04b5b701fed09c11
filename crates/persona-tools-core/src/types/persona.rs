//! Persona, tool declaration and user records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{ToolError, ToolResult};

/// Identifier of a tool declaration row
pub type ToolId = i64;

/// A single HTTP header attached to custom tool calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderItem {
    pub key: String,
    pub value: String,
}

impl HeaderItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Convert a header map into the list form stored on declarations
pub fn header_map_to_list(headers: &BTreeMap<String, String>) -> Vec<HeaderItem> {
    headers
        .iter()
        .map(|(k, v)| HeaderItem::new(k.clone(), v.clone()))
        .collect()
}

/// One tool configured on a persona
///
/// Exactly one of `in_code_tool_id` and `openapi_schema` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub id: ToolId,
    pub name: String,
    /// Reference to a built-in capability (e.g. `SearchTool`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_code_tool_id: Option<String>,
    /// OpenAPI 3 document describing a custom tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi_schema: Option<Value>,
    #[serde(default)]
    pub custom_headers: Vec<HeaderItem>,
    /// Forward the calling user's OAuth token to the tool
    #[serde(default)]
    pub passthrough_auth: bool,
}

/// What a declaration points at, after validation
#[derive(Debug, Clone, Copy)]
pub enum DeclarationSource<'a> {
    BuiltIn(&'a str),
    Schema(&'a Value),
}

impl ToolDeclaration {
    /// Declaration of a built-in capability
    pub fn builtin(id: ToolId, name: impl Into<String>, in_code_tool_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            in_code_tool_id: Some(in_code_tool_id.into()),
            openapi_schema: None,
            custom_headers: Vec::new(),
            passthrough_auth: false,
        }
    }

    /// Declaration of a custom OpenAPI tool
    pub fn custom(id: ToolId, name: impl Into<String>, schema: Value) -> Self {
        Self {
            id,
            name: name.into(),
            in_code_tool_id: None,
            openapi_schema: Some(schema),
            custom_headers: Vec::new(),
            passthrough_auth: false,
        }
    }

    pub fn with_headers(mut self, headers: Vec<HeaderItem>) -> Self {
        self.custom_headers = headers;
        self
    }

    pub fn with_passthrough_auth(mut self, enabled: bool) -> Self {
        self.passthrough_auth = enabled;
        self
    }

    /// Classify the declaration, rejecting rows with both or neither source set
    pub fn source(&self) -> ToolResult<DeclarationSource<'_>> {
        match (&self.in_code_tool_id, &self.openapi_schema) {
            (Some(id), None) => Ok(DeclarationSource::BuiltIn(id)),
            (None, Some(schema)) => Ok(DeclarationSource::Schema(schema)),
            (Some(_), Some(_)) => Err(ToolError::invalid_declaration(
                self.id,
                "both a built-in tool reference and an OpenAPI schema are set",
            )),
            (None, None) => Err(ToolError::invalid_declaration(
                self.id,
                "neither a built-in tool reference nor an OpenAPI schema is set",
            )),
        }
    }
}

/// Prompt settings carried into search-like tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub task_prompt: String,
    #[serde(default)]
    pub datetime_aware: bool,
    #[serde(default = "default_true")]
    pub include_citations: bool,
}

fn default_true() -> bool {
    true
}

/// A named assistant configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Persona {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub tools: Vec<ToolDeclaration>,
    /// Ask the LLM to filter retrieved documents for relevance
    #[serde(default)]
    pub llm_relevance_filter: bool,
    #[serde(default)]
    pub prompts: Vec<PromptConfig>,
}

impl Persona {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tool(mut self, tool: ToolDeclaration) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_prompt(mut self, prompt: PromptConfig) -> Self {
        self.prompts.push(prompt);
        self
    }

    pub fn with_relevance_filter(mut self, enabled: bool) -> Self {
        self.llm_relevance_filter = enabled;
        self
    }
}

/// Linked external account (e.g. the OAuth login provider)
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthAccount {
    pub oauth_name: String,
    pub access_token: String,
}

impl std::fmt::Debug for OAuthAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthAccount")
            .field("oauth_name", &self.oauth_name)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// The user a construction pass runs for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub oauth_accounts: Vec<OAuthAccount>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            oauth_accounts: Vec::new(),
        }
    }

    pub fn with_oauth_account(mut self, name: impl Into<String>, token: impl Into<String>) -> Self {
        self.oauth_accounts.push(OAuthAccount {
            oauth_name: name.into(),
            access_token: token.into(),
        });
        self
    }

    /// Access token of the first linked account, if any
    pub fn oauth_token(&self) -> Option<&str> {
        self.oauth_accounts
            .first()
            .map(|a| a.access_token.as_str())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declaration_source() {
        let builtin = ToolDeclaration::builtin(1, "Search", "SearchTool");
        assert!(matches!(builtin.source(), Ok(DeclarationSource::BuiltIn("SearchTool"))));

        let custom = ToolDeclaration::custom(2, "Weather", json!({"openapi": "3.0.0"}));
        assert!(matches!(custom.source(), Ok(DeclarationSource::Schema(_))));
    }

    #[test]
    fn test_declaration_with_both_sources_is_invalid() {
        let mut decl = ToolDeclaration::builtin(3, "Broken", "SearchTool");
        decl.openapi_schema = Some(json!({}));
        assert!(matches!(
            decl.source(),
            Err(ToolError::InvalidDeclaration { id: 3, .. })
        ));

        decl.in_code_tool_id = None;
        decl.openapi_schema = None;
        assert!(decl.source().is_err());
    }

    #[test]
    fn test_header_map_to_list() {
        let mut map = BTreeMap::new();
        map.insert("X-B".to_string(), "2".to_string());
        map.insert("X-A".to_string(), "1".to_string());
        let list = header_map_to_list(&map);
        assert_eq!(list, vec![HeaderItem::new("X-A", "1"), HeaderItem::new("X-B", "2")]);
    }

    #[test]
    fn test_user_oauth_token_uses_first_account() {
        let user = User::new("u1", "a@b.c")
            .with_oauth_account("google", "tok-1")
            .with_oauth_account("github", "tok-2");
        assert_eq!(user.oauth_token(), Some("tok-1"));
        assert_eq!(User::new("u2", "x@y.z").oauth_token(), None);
        assert!(!format!("{:?}", user).contains("tok-1"));
    }

    #[test]
    fn test_persona_deserializes_with_defaults() {
        let persona: Persona = serde_json::from_value(json!({
            "id": 7,
            "name": "Helper",
            "tools": [{"id": 1, "name": "Search", "in_code_tool_id": "SearchTool"}]
        }))
        .unwrap();
        assert_eq!(persona.tools.len(), 1);
        assert!(!persona.llm_relevance_filter);
        assert!(!persona.tools[0].passthrough_auth);
    }
}
