use crate::error::{CsrfError, Result};
use rampart_core::HttpMethod;
use serde::{Deserialize, Serialize};

/// Smallest accepted random value length in bytes.
pub const MIN_STRENGTH: usize = 16;

/// How long issued tokens stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Tokens survive validation and are never evicted.
    Persistent,
    /// Tokens are consumed by validation; at most this many are kept.
    Bounded(usize),
}

impl Retention {
    /// Interpret a signed storage limit: negative means persistent.
    pub fn from_limit(limit: i64) -> Self {
        match usize::try_from(limit) {
            Ok(limit) => Retention::Bounded(limit),
            Err(_) => Retention::Persistent,
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Retention::Persistent)
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            Retention::Persistent => None,
            Retention::Bounded(limit) => Some(*limit),
        }
    }
}

/// CSRF guard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Token namespace; also the stem of the form field names
    pub prefix: String,

    /// Maximum outstanding tokens; negative selects persistent mode
    pub storage_limit: i64,

    /// Random bytes per token value
    pub strength: usize,

    /// Methods that are never validated
    pub safe_methods: Vec<String>,

    /// Path prefixes that are never validated
    pub exclude_paths: Vec<String>,

    /// Header carrying the token name when a form body is not used
    pub header_name: String,

    /// Header carrying the token value when a form body is not used
    pub header_value: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            prefix: "csrf".to_string(),
            storage_limit: 200,
            strength: MIN_STRENGTH,
            safe_methods: HttpMethod::ALL
                .iter()
                .filter(|m| m.is_safe())
                .map(|m| m.as_str().to_string())
                .collect(),
            exclude_paths: Vec::new(),
            header_name: "X-CSRF-Name".to_string(),
            header_value: "X-CSRF-Value".to_string(),
        }
    }
}

impl GuardConfig {
    /// Create a configuration for the given namespace
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::default().with_prefix(prefix)
    }

    /// Set the namespace. A trailing `_` is dropped.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the storage limit; negative selects persistent mode.
    ///
    /// A limit of `0` is refused by [`GuardConfig::validate`] with
    /// [`CsrfError::Config`]: such a guard would evict each token as soon as
    /// it is issued, so no submission could ever be accepted.
    pub fn with_storage_limit(mut self, limit: i64) -> Self {
        self.storage_limit = limit;
        self
    }

    /// Keep tokens across validations and never evict them
    pub fn persistent(self) -> Self {
        self.with_storage_limit(-1)
    }

    /// Set random value length in bytes
    pub fn with_strength(mut self, strength: usize) -> Self {
        self.strength = strength;
        self
    }

    /// Replace the methods that bypass validation
    pub fn with_safe_methods(mut self, methods: Vec<String>) -> Self {
        self.safe_methods = methods;
        self
    }

    /// Add excluded paths
    pub fn with_exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.exclude_paths = paths;
        self
    }

    /// Set the header pair used instead of form fields
    pub fn with_headers(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_name = name.into();
        self.header_value = value.into();
        self
    }

    /// Namespace with the trailing separator removed.
    pub fn normalized_prefix(&self) -> &str {
        self.prefix.trim_end_matches('_')
    }

    pub fn retention(&self) -> Retention {
        Retention::from_limit(self.storage_limit)
    }

    /// Check the configuration before a guard is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.normalized_prefix().is_empty() {
            return Err(CsrfError::Config("prefix must not be empty".to_string()));
        }

        if self.strength < MIN_STRENGTH {
            return Err(CsrfError::Config(format!(
                "strength must be at least {} bytes, got {}",
                MIN_STRENGTH, self.strength
            )));
        }

        // A zero limit would evict every token as soon as it is issued.
        if self.retention() == Retention::Bounded(0) {
            return Err(CsrfError::Config(
                "storage limit must be negative (persistent) or at least 1".to_string(),
            ));
        }

        if self.header_name.is_empty() || self.header_value.is_empty() {
            return Err(CsrfError::Config("header names must not be empty".to_string()));
        }

        Ok(())
    }
}
