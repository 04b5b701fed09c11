//! Token counting for tool definitions
//!
//! Counts are estimated from character length with per-family ratios. Every
//! caller goes through [`Tokenizer::count_tokens`], so swapping in an exact
//! BPE tokenizer later only touches [`get_tokenizer`].

use std::sync::Arc;

/// Anything that can count tokens for a model
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Tokenizer families with distinct chars-per-token ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerFamily {
    /// GPT-4 / GPT-4o / Claude class vocabularies
    Cl100k,
    /// o-series reasoning models
    O200k,
    Gemini,
    /// Llama, Mistral and other SentencePiece models
    SentencePiece,
    Heuristic,
}

impl TokenizerFamily {
    pub fn chars_per_token(&self) -> f32 {
        match self {
            TokenizerFamily::Cl100k => 3.7,
            TokenizerFamily::O200k => 3.9,
            TokenizerFamily::Gemini => 3.5,
            TokenizerFamily::SentencePiece => 3.3,
            TokenizerFamily::Heuristic => 3.5,
        }
    }

    /// Pick the family for a model name and provider
    pub fn detect(model_name: &str, provider: &str) -> Self {
        let model = model_name.to_lowercase();
        let provider = provider.to_lowercase();
        // Strip routing prefixes like "azure/" or "openrouter/meta-llama/"
        let base = model.rsplit('/').next().unwrap_or(&model);

        if base.starts_with("o1") || base.starts_with("o3") || base.starts_with("o4") {
            TokenizerFamily::O200k
        } else if base.starts_with("gpt") || base.contains("claude") {
            TokenizerFamily::Cl100k
        } else if base.contains("gemini") || provider == "google" || provider == "vertex_ai" {
            TokenizerFamily::Gemini
        } else if base.contains("llama") || base.contains("mistral") || base.contains("mixtral") {
            TokenizerFamily::SentencePiece
        } else if provider == "openai" || provider == "azure" || provider == "anthropic" {
            TokenizerFamily::Cl100k
        } else {
            TokenizerFamily::Heuristic
        }
    }
}

/// Character-ratio tokenizer
#[derive(Debug, Clone)]
pub struct HeuristicTokenizer {
    family: TokenizerFamily,
}

impl HeuristicTokenizer {
    pub fn new(family: TokenizerFamily) -> Self {
        Self { family }
    }

    pub fn family(&self) -> TokenizerFamily {
        self.family
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        // chars, not bytes, so CJK text is not overcounted
        let chars = text.chars().count() as f32;
        ((chars / self.family.chars_per_token()).ceil() as usize).max(1)
    }
}

/// Tokenizer for a model
pub fn get_tokenizer(model_name: &str, provider: &str) -> Arc<dyn Tokenizer> {
    Arc::new(HeuristicTokenizer::new(TokenizerFamily::detect(model_name, provider)))
}
