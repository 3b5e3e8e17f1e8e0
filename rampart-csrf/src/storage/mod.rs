//! Token storage backends
//!
//! A guard keeps every outstanding token in a [`TokenStore`]. Three backends
//! are provided:
//!
//! - **Memory**: insertion-ordered map owned by the caller or the guard
//! - **Session**: a region of the request's session keyed by the guard prefix
//! - **Unordered**: a plain hash map; the storage limit cannot be enforced

mod memory;
mod session;
mod unordered;

pub use memory::MemoryTokenStore;
pub use session::SessionTokenStore;
pub use unordered::UnorderedTokenStore;

use parking_lot::Mutex;
use std::sync::Arc;

/// Storage shared between a guard and its caller.
///
/// The mutex is held for a whole guard operation, so guards built on clones
/// of one handle never interleave. Stores reached through separate handles
/// (one [`SessionTokenStore`] per request over the same session) rely on
/// [`TokenStore::remove`] and [`TokenStore::evict_oldest`] being atomic
/// instead.
pub type SharedStore<S> = Arc<Mutex<S>>;

/// Wrap a store for sharing with a guard.
pub fn shared<S: TokenStore>(store: S) -> SharedStore<S> {
    Arc::new(Mutex::new(store))
}

/// Map of token name to token value
pub trait TokenStore: Send {
    /// Attach to or create the backing region for `namespace`.
    ///
    /// Called before every guard pass; must be idempotent.
    fn ensure(&mut self, _namespace: &str) {}

    /// Look up a token value by name
    fn get(&self, name: &str) -> Option<String>;

    /// Insert or overwrite a token
    fn insert(&mut self, name: String, value: String);

    /// Remove a token, returning its value if it was present.
    ///
    /// Guards rely on this being atomic for single-use tokens: of two
    /// concurrent removals of one name, at most one may return `Some`.
    fn remove(&mut self, name: &str) -> Option<String>;

    /// Number of stored tokens
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insertion-order traversal, if the backend supports it.
    ///
    /// Without it the storage limit cannot be enforced.
    fn ordered(&self) -> Option<&dyn OrderedTokenStore> {
        None
    }

    /// Remove the oldest tokens until at most `limit` remain, returning the
    /// evicted names oldest first.
    ///
    /// `None` if the store has no insertion order. Backends shared outside
    /// the guard mutex must override this to count and remove under one lock,
    /// otherwise two concurrent passes can both evict and undershoot `limit`.
    fn evict_oldest(&mut self, limit: usize) -> Option<Vec<String>> {
        if self.ordered().is_none() {
            return None;
        }

        let mut evicted = Vec::new();
        while self.len() > limit {
            let Some(name) = self.ordered().and_then(|o| o.oldest()) else {
                break;
            };
            if self.remove(&name).is_none() {
                break;
            }
            evicted.push(name);
        }

        Some(evicted)
    }
}

/// Traversal of stored tokens, oldest first
pub trait OrderedTokenStore {
    /// `(name, value)` pairs in insertion order
    fn entries(&self) -> Box<dyn Iterator<Item = (String, String)> + '_>;

    /// Name of the earliest inserted token
    fn oldest(&self) -> Option<String> {
        self.entries().next().map(|(name, _)| name)
    }
}
