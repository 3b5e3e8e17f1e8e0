//! In-memory token store
//!
//! Backed by an `IndexMap` so iteration follows insertion order. Removals
//! shift later entries down, keeping the order of the survivors intact.

use super::{OrderedTokenStore, TokenStore};
use indexmap::IndexMap;

/// In-memory, insertion-ordered token store
#[derive(Debug, Default, Clone)]
pub struct MemoryTokenStore {
    tokens: IndexMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token names, oldest first (for inspection and tests)
    pub fn names(&self) -> Vec<String> {
        self.tokens.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tokens.contains_key(name)
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, name: &str) -> Option<String> {
        self.tokens.get(name).cloned()
    }

    fn insert(&mut self, name: String, value: String) {
        self.tokens.insert(name, value);
    }

    fn remove(&mut self, name: &str) -> Option<String> {
        self.tokens.shift_remove(name)
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn ordered(&self) -> Option<&dyn OrderedTokenStore> {
        Some(self)
    }
}

impl OrderedTokenStore for MemoryTokenStore {
    fn entries(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(self.tokens.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    fn oldest(&self) -> Option<String> {
        self.tokens.first().map(|(name, _)| name.clone())
    }
}
