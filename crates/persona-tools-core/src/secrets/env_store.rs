//! Environment variable secret store

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::traits::SecretStore;

/// Logical key → environment variables, tried in order
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("azure_dalle", vec!["AZURE_DALLE_API_KEY"]);
    m.insert("bing", vec!["BING_API_KEY"]);
    m.insert("exa", vec!["EXA_API_KEY"]);
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m
});

/// Secret store backed by process environment variables
///
/// Lookups go through an injectable function so tests never have to touch
/// the real environment.
///
/// ```
/// use persona_tools_core::secrets::{EnvSecretStore, SecretStore};
///
/// let store = EnvSecretStore::with_lookup(|name| {
///     (name == "BING_API_KEY").then(|| "bing-key".to_string())
/// });
/// assert_eq!(store.get("bing"), Some("bing-key".to_string()));
/// ```
pub struct EnvSecretStore {
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSecretStore {
    /// Read from the real process environment
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Read through a custom lookup function
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Environment variables consulted for a logical key
    pub fn env_vars_for(key: &str) -> Option<&'static [&'static str]> {
        ENV_VAR_MAP.get(key.to_lowercase().as_str()).map(|v| v.as_slice())
    }

    fn read(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(vars) = Self::env_vars_for(key) {
            if let Some(value) = vars.iter().find_map(|var| self.read(var)) {
                return Some(value);
            }
        }
        self.read(key)
    }
}

impl std::fmt::Debug for EnvSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSecretStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(pairs: &'static [(&'static str, &'static str)]) -> EnvSecretStore {
        EnvSecretStore::with_lookup(move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn test_logical_key_maps_to_env_var() {
        let store = store_with(&[("EXA_API_KEY", "exa-secret")]);
        assert_eq!(store.get("exa"), Some("exa-secret".to_string()));
        assert_eq!(store.get("EXA"), Some("exa-secret".to_string()));
        assert_eq!(store.get("bing"), None);
    }

    #[test]
    fn test_raw_env_var_name() {
        let store = store_with(&[("CUSTOM_TOKEN", "abc")]);
        assert_eq!(store.get("CUSTOM_TOKEN"), Some("abc".to_string()));
    }

    #[test]
    fn test_blank_values_are_missing() {
        let store = store_with(&[("BING_API_KEY", "  ")]);
        assert!(!store.has("bing"));
        assert!(!store.get_info("bing").available);
    }
}
