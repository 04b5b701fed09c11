//! Token budget for tool definitions
//!
//! Tool definitions are sent with every request, so their token cost is
//! context overhead shared by every search-like tool. The budget is computed
//! over the whole assembled tool set and attached to each prunable config.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::config::PrunableConfig;
use crate::tokenizer::Tokenizer;
use crate::types::Tool;

/// Model prefixes with native function calling, per provider
static NATIVE_TOOL_CALLING: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    let openai = vec!["gpt-4", "gpt-3.5-turbo", "gpt-5", "o1", "o3", "o4"];
    vec![
        ("openai", openai.clone()),
        ("azure", openai),
        ("anthropic", vec!["claude-3", "claude-sonnet-4", "claude-opus-4", "claude-4"]),
        ("bedrock", vec!["anthropic.claude-3", "anthropic.claude-sonnet-4", "anthropic.claude-opus-4"]),
        ("vertex_ai", vec!["gemini-1.5", "gemini-2", "claude-3"]),
    ]
});

/// Models that match a prefix above but cannot use native tool calls
static NO_NATIVE_TOOL_CALLING: &[&str] = &["o1-mini", "o1-preview", "gpt-3.5-turbo-instruct"];

/// Whether the model can signal tool calls natively instead of through an
/// in-prompt convention
pub fn explicit_tool_calling_supported(provider: &str, model_name: &str) -> bool {
    let provider = provider.to_lowercase();
    let model = model_name.to_lowercase();
    let model = model.rsplit('/').next().unwrap_or(&model);

    if NO_NATIVE_TOOL_CALLING.iter().any(|m| model.starts_with(m)) {
        return false;
    }

    NATIVE_TOOL_CALLING
        .iter()
        .find(|(p, _)| *p == provider)
        .map(|(_, prefixes)| prefixes.iter().any(|prefix| model.starts_with(prefix)))
        .unwrap_or(false)
}

/// Sum of the token counts of every tool's serialized definition
pub fn compute_all_tool_tokens(tools: &[Arc<dyn Tool>], tokenizer: &dyn Tokenizer) -> usize {
    tools
        .iter()
        .map(|tool| tokenizer.count_tokens(&tool.definition().to_function_json().to_string()))
        .sum()
}

/// Token accounting handed to the pruning stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenBudget {
    /// Tokens taken by all tool definitions together
    pub tool_definition_tokens: usize,
    /// Tool calls go through the model's native mechanism
    pub uses_native_tool_calling: bool,
}

impl TokenBudget {
    pub fn compute(
        tools: &[Arc<dyn Tool>],
        tokenizer: &dyn Tokenizer,
        provider: &str,
        model_name: &str,
    ) -> Self {
        Self {
            tool_definition_tokens: compute_all_tool_tokens(tools, tokenizer),
            uses_native_tool_calling: explicit_tool_calling_supported(provider, model_name),
        }
    }
}

/// A prunable config together with its budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetedConfig<C: PrunableConfig> {
    pub config: C,
    pub budget: TokenBudget,
}

impl<C: PrunableConfig> BudgetedConfig<C> {
    pub fn new(config: C, budget: TokenBudget) -> Self {
        Self { config, budget }
    }

    /// Tokens the pruning stage should reserve before fitting documents
    pub fn reserved_tokens(&self) -> usize {
        self.budget.tool_definition_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchToolConfig;
    use crate::tokenizer::get_tokenizer;
    use crate::tools::ToolResult;
    use crate::types::{CapabilityKind, ToolDefinition, ToolResponse};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Dummy(String);

    #[async_trait]
    impl Tool for Dummy {
        fn name(&self) -> &str {
            &self.0
        }
        fn description(&self) -> &str {
            "dummy tool used for token counting"
        }
        fn kind(&self) -> CapabilityKind {
            CapabilityKind::Custom
        }
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(
                self.0.clone(),
                self.description(),
                json!({"type": "object", "properties": {"q": {"type": "string"}}}),
            )
        }
        async fn run(&self, _args: Value) -> ToolResult<Vec<ToolResponse>> {
            Ok(vec![])
        }
    }

    fn dummy(name: &str) -> Arc<dyn Tool> {
        Arc::new(Dummy(name.to_string()))
    }

    #[test]
    fn test_native_tool_calling_support() {
        assert!(explicit_tool_calling_supported("openai", "gpt-4o"));
        assert!(explicit_tool_calling_supported("azure", "azure/gpt-4"));
        assert!(explicit_tool_calling_supported("anthropic", "claude-3-5-sonnet-20241022"));
        assert!(!explicit_tool_calling_supported("openai", "o1-mini"));
        assert!(!explicit_tool_calling_supported("openai", "gpt-3.5-turbo-instruct"));
        assert!(!explicit_tool_calling_supported("ollama", "llama3"));
    }

    #[test]
    fn test_empty_tool_set_costs_nothing() {
        let tokenizer = get_tokenizer("gpt-4o", "openai");
        assert_eq!(compute_all_tool_tokens(&[], tokenizer.as_ref()), 0);
    }

    #[test]
    fn test_adding_tools_never_reduces_tokens() {
        let tokenizer = get_tokenizer("gpt-4o", "openai");
        let mut tools = Vec::new();
        let mut previous = 0;
        for name in ["a", "search_everything", "b", "weather_lookup_by_city"] {
            tools.push(dummy(name));
            let total = compute_all_tool_tokens(&tools, tokenizer.as_ref());
            assert!(total >= previous);
            previous = total;
        }
        assert!(previous > 0);
    }

    #[test]
    fn test_budget_is_deterministic() {
        let tokenizer = get_tokenizer("gpt-4o", "openai");
        let tools = vec![dummy("x"), dummy("y")];
        let first = TokenBudget::compute(&tools, tokenizer.as_ref(), "openai", "gpt-4o");
        let second = TokenBudget::compute(&tools, tokenizer.as_ref(), "openai", "gpt-4o");
        assert_eq!(first, second);
        assert!(first.uses_native_tool_calling);
    }

    #[test]
    fn test_budgeted_config_keeps_config_untouched() {
        let config = SearchToolConfig::default();
        let budget = TokenBudget {
            tool_definition_tokens: 42,
            uses_native_tool_calling: false,
        };
        let budgeted = BudgetedConfig::new(config.clone(), budget);
        assert_eq!(budgeted.config, config);
        assert_eq!(budgeted.reserved_tokens(), 42);
    }
}
