//! Hash map token store without ordering

use super::TokenStore;
use std::collections::HashMap;

/// Token store over a plain `HashMap`.
///
/// It has no insertion order, so a guard using it cannot evict the oldest
/// tokens and the storage limit is not enforced.
#[derive(Debug, Default, Clone)]
pub struct UnorderedTokenStore {
    tokens: HashMap<String, String>,
}

impl UnorderedTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<HashMap<String, String>> for UnorderedTokenStore {
    fn from(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

impl TokenStore for UnorderedTokenStore {
    fn get(&self, name: &str) -> Option<String> {
        self.tokens.get(name).cloned()
    }

    fn insert(&mut self, name: String, value: String) {
        self.tokens.insert(name, value);
    }

    fn remove(&mut self, name: &str) -> Option<String> {
        self.tokens.remove(name)
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }
}
