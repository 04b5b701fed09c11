//! Chained secret store with fallback behavior

use std::sync::Arc;

use super::traits::{SecretInfo, SecretStore};

/// Tries each store in order and returns the first hit
///
/// ```
/// use std::sync::Arc;
/// use persona_tools_core::secrets::{ChainSecretStore, MemorySecretStore, SecretStore};
///
/// let overrides = Arc::new(MemorySecretStore::new().with_secret("exa", "override"));
/// let defaults = Arc::new(MemorySecretStore::new().with_secret("exa", "default"));
/// let chain = ChainSecretStore::new(vec![overrides, defaults]);
/// assert_eq!(chain.get("exa"), Some("override".to_string()));
/// ```
#[derive(Clone, Default)]
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainSecretStore {
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        Self { stores }
    }

    /// Append a lower-priority store
    pub fn push(&mut self, store: Arc<dyn SecretStore>) {
        self.stores.push(store);
    }

    pub fn stores(&self) -> &[Arc<dyn SecretStore>] {
        &self.stores
    }

    fn available(&self) -> impl Iterator<Item = &Arc<dyn SecretStore>> {
        self.stores.iter().filter(|s| s.is_available())
    }
}

impl SecretStore for ChainSecretStore {
    fn name(&self) -> &str {
        "chain"
    }

    fn is_available(&self) -> bool {
        self.stores.iter().any(|s| s.is_available())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.available().find_map(|s| s.get(key))
    }

    fn get_info(&self, key: &str) -> SecretInfo {
        self.available()
            .find(|s| s.has(key))
            .map(|s| SecretInfo::new(true, s.name()))
            .unwrap_or_else(SecretInfo::not_found)
    }
}

impl std::fmt::Debug for ChainSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stores.iter().map(|s| s.name()).collect();
        f.debug_struct("ChainSecretStore")
            .field("stores", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{EnvSecretStore, MemorySecretStore};

    struct Offline;

    impl SecretStore for Offline {
        fn name(&self) -> &str {
            "offline"
        }
        fn is_available(&self) -> bool {
            false
        }
        fn get(&self, _key: &str) -> Option<String> {
            Some("should never be read".to_string())
        }
    }

    #[test]
    fn test_first_hit_wins() {
        let first = Arc::new(MemorySecretStore::new().with_secret("bing", "one"));
        let second = Arc::new(MemorySecretStore::new().with_secret("bing", "two"));
        let chain = ChainSecretStore::new(vec![first, second]);
        assert_eq!(chain.get("bing"), Some("one".to_string()));
    }

    #[test]
    fn test_falls_back_to_later_store() {
        let empty = Arc::new(MemorySecretStore::new());
        let env = Arc::new(EnvSecretStore::with_lookup(|name| {
            (name == "EXA_API_KEY").then(|| "from-env".to_string())
        }));
        let chain = ChainSecretStore::new(vec![empty, env]);

        assert_eq!(chain.get("exa"), Some("from-env".to_string()));
        assert_eq!(chain.get_info("exa").source, "env");
        assert!(!chain.get_info("bing").available);
    }

    #[test]
    fn test_unavailable_stores_are_skipped() {
        let mut chain = ChainSecretStore::new(vec![Arc::new(Offline)]);
        assert!(!chain.is_available());
        assert_eq!(chain.get("exa"), None);

        chain.push(Arc::new(MemorySecretStore::new()));
        assert!(chain.is_available());
    }
}
