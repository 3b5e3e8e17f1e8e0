use crate::{
    config::{GuardConfig, Retention},
    error::{CsrfError, Result},
    storage::{self, MemoryTokenStore, SessionTokenStore, SharedStore, TokenStore},
    token::{self, KeyPair, TokenFields},
};
use rampart_core::{HttpRequest, form};
use rampart_session::SessionHandle;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, trace, warn};

/// Why a submission was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Name or value was not submitted
    MissingToken,
    /// The submitted name is not in storage
    UnknownToken,
    /// The stored value differs from the submitted one
    Mismatch,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingToken => "missing_token",
            RejectReason::UnknownToken => "unknown_token",
            RejectReason::Mismatch => "mismatch",
        }
    }
}

/// Outcome of checking one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Method or path is not protected
    Exempt,
    /// A valid token was submitted
    Accepted,
    /// The request must not be processed
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Verdict::Rejected(_))
    }
}

/// Synchronizer-token CSRF guard
///
/// One guard serves one request. It reads and writes tokens only through
/// its [`TokenStore`], which outlives it (typically session-scoped), and
/// caches the key pair it issued so every form on a page gets the same one.
pub struct TokenGuard<S: TokenStore = MemoryTokenStore> {
    config: GuardConfig,
    prefix: String,
    store: SharedStore<S>,
    key_pair: Option<KeyPair>,
    warned_unordered: bool,
}

impl TokenGuard<MemoryTokenStore> {
    /// Create a guard with a fresh in-memory store of its own
    pub fn new(config: GuardConfig) -> Result<Self> {
        Self::with_store(config, storage::shared(MemoryTokenStore::new()))
    }
}

impl TokenGuard<SessionTokenStore> {
    /// Create a guard keeping its tokens in `session` under the prefix
    pub fn with_session(config: GuardConfig, session: SessionHandle) -> Result<Self> {
        let store = SessionTokenStore::new(session, config.normalized_prefix());
        Self::with_store(config, storage::shared(store))
    }
}

impl<S: TokenStore> TokenGuard<S> {
    /// Create a guard over a store shared with the caller
    pub fn with_store(config: GuardConfig, store: SharedStore<S>) -> Result<Self> {
        config.validate()?;
        let prefix = config.normalized_prefix().to_string();

        let guard = Self {
            config,
            prefix,
            store,
            key_pair: None,
            warned_unordered: false,
        };
        guard.ensure_storage();

        Ok(guard)
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Namespace with the trailing separator trimmed
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Handle to the backing store
    pub fn storage(&self) -> SharedStore<S> {
        Arc::clone(&self.store)
    }

    /// Make sure the backing store has a region for this guard.
    pub fn ensure_storage(&self) {
        self.store.lock().ensure(&self.prefix);
    }

    /// Form field carrying the token name
    pub fn token_name_key(&self) -> String {
        token::name_key(&self.prefix)
    }

    /// Form field carrying the token value
    pub fn token_value_key(&self) -> String {
        token::value_key(&self.prefix)
    }

    /// Name of the current key pair, if one was issued or loaded
    pub fn token_name(&self) -> Option<&str> {
        self.key_pair.as_ref().map(|p| p.name.as_str())
    }

    /// Value of the current key pair, if one was issued or loaded
    pub fn token_value(&self) -> Option<&str> {
        self.key_pair.as_ref().map(|p| p.value.as_str())
    }

    /// Issue a new token and make it the current key pair
    pub fn generate_token(&mut self) -> Result<TokenFields> {
        let store = Arc::clone(&self.store);
        let mut store = store.lock();
        store.ensure(&self.prefix);

        let pair = self.issue(&mut *store)?;
        self.enforce_limit(&mut *store);

        Ok(TokenFields::new(&self.prefix, &pair))
    }

    /// Token to embed in outgoing content.
    ///
    /// Issued once per guard. In persistent mode the newest stored token of
    /// this namespace is reused instead of issuing another.
    pub fn get_token(&mut self) -> Result<TokenFields> {
        if let Some(pair) = &self.key_pair {
            return Ok(TokenFields::new(&self.prefix, pair));
        }

        if self.config.retention().is_persistent() {
            if let Some(pair) = self.load_last_key_pair() {
                debug!(prefix = %self.prefix, name = %pair.name, "Reusing persistent CSRF token");
                let fields = TokenFields::new(&self.prefix, &pair);
                self.key_pair = Some(pair);
                return Ok(fields);
            }
        }

        self.generate_token()
    }

    /// Current token as `(header, value)` pairs for non-form clients
    pub fn token_headers(&mut self) -> Result<[(String, String); 2]> {
        let fields = self.get_token()?;
        Ok([
            (self.config.header_name.clone(), fields.name),
            (self.config.header_value.clone(), fields.value),
        ])
    }

    /// Whether `request` must carry a valid token
    pub fn needs_protection(&self, request: &HttpRequest) -> bool {
        if self
            .config
            .safe_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&request.method))
        {
            return false;
        }

        !self
            .config
            .exclude_paths
            .iter()
            .any(|excluded| request.path.starts_with(excluded.as_str()))
    }

    /// Check a request and record the outcome in storage.
    ///
    /// A rejected request gets a fresh key pair so the client can retry.
    /// The storage limit is enforced on every call, exempt requests included.
    /// Only a CSPRNG failure is reported as an error.
    pub fn check(&mut self, request: &HttpRequest) -> Result<Verdict> {
        let store = Arc::clone(&self.store);
        let mut store = store.lock();
        store.ensure(&self.prefix);

        let verdict = if !self.needs_protection(request) {
            Verdict::Exempt
        } else {
            match self.extract(request) {
                None => Verdict::Rejected(RejectReason::MissingToken),
                Some((name, value)) => match self.consume(&mut *store, &name, &value) {
                    Ok(()) => Verdict::Accepted,
                    Err(reason) => Verdict::Rejected(reason),
                },
            }
        };

        let reissued = match verdict {
            Verdict::Rejected(reason) => {
                warn!(
                    prefix = %self.prefix,
                    method = %request.method,
                    path = %request.path,
                    reason = reason.as_str(),
                    "CSRF check failed"
                );
                self.issue(&mut *store).map(|_| ())
            }
            Verdict::Accepted => {
                debug!(prefix = %self.prefix, path = %request.path, "CSRF token accepted");
                Ok(())
            }
            Verdict::Exempt => Ok(()),
        };

        self.enforce_limit(&mut *store);
        reissued?;

        Ok(verdict)
    }

    /// Check a request, reducing the outcome to pass/fail
    pub fn validate(&mut self, request: &HttpRequest) -> Result<bool> {
        Ok(self.check(request)?.is_valid())
    }

    /// Check a request, turning a rejection into an error
    pub fn require(&mut self, request: &HttpRequest) -> Result<()> {
        match self.check(request)? {
            Verdict::Exempt | Verdict::Accepted => Ok(()),
            Verdict::Rejected(RejectReason::MissingToken) => Err(CsrfError::MissingToken),
            Verdict::Rejected(_) => Err(CsrfError::InvalidToken),
        }
    }

    /// Validate a submitted pair against storage.
    ///
    /// Outside persistent mode the token is consumed. A mismatching token is
    /// removed in every mode.
    pub fn validate_token(&mut self, name: &str, value: &str) -> bool {
        let store = Arc::clone(&self.store);
        let mut store = store.lock();
        self.consume(&mut *store, name, value).is_ok()
    }

    /// Evict the oldest tokens beyond the configured limit
    pub fn enforce_storage_limit(&mut self) {
        let store = Arc::clone(&self.store);
        let mut store = store.lock();
        self.enforce_limit(&mut *store);
    }

    /// Remove one token from storage
    pub fn remove_token(&mut self, name: &str) -> bool {
        let removed = self.store.lock().remove(name).is_some();
        if removed {
            self.forget_if_current(name);
        }
        removed
    }

    fn issue(&mut self, store: &mut S) -> Result<KeyPair> {
        let pair = KeyPair::generate(&self.prefix, self.config.strength)?;
        store.insert(pair.name.clone(), pair.value.clone());
        debug!(prefix = %self.prefix, name = %pair.name, "Issued CSRF token");

        self.key_pair = Some(pair.clone());
        Ok(pair)
    }

    fn consume(
        &mut self,
        store: &mut S,
        name: &str,
        value: &str,
    ) -> std::result::Result<(), RejectReason> {
        let persistent = self.config.retention().is_persistent();

        // Single-use tokens are taken out before comparing, so two
        // concurrent submissions cannot both see the value.
        let stored = if persistent {
            store.get(name)
        } else {
            store.remove(name)
        };

        let Some(stored) = stored else {
            return Err(RejectReason::UnknownToken);
        };

        let matches: bool = stored.as_bytes().ct_eq(value.as_bytes()).into();

        if persistent && !matches {
            store.remove(name);
        }
        if !persistent || !matches {
            self.forget_if_current(name);
        }

        if matches {
            Ok(())
        } else {
            Err(RejectReason::Mismatch)
        }
    }

    fn enforce_limit(&mut self, store: &mut S) {
        let Retention::Bounded(limit) = self.config.retention() else {
            return;
        };

        let Some(evicted) = store.evict_oldest(limit) else {
            if !self.warned_unordered && store.len() > limit {
                warn!(
                    prefix = %self.prefix,
                    stored = store.len(),
                    limit,
                    "Token store cannot be traversed in order; storage limit not enforced"
                );
                self.warned_unordered = true;
            }
            return;
        };

        for name in evicted {
            trace!(prefix = %self.prefix, name = %name, "Evicted CSRF token");
            self.forget_if_current(&name);
        }
    }

    fn load_last_key_pair(&self) -> Option<KeyPair> {
        let mut store = self.store.lock();
        store.ensure(&self.prefix);

        let last = store
            .ordered()?
            .entries()
            .filter(|(name, _)| token::is_token_name(&self.prefix, name))
            .last();
        last.map(KeyPair::from)
    }

    fn extract(&self, request: &HttpRequest) -> Option<(String, String)> {
        let name_key = self.token_name_key();
        let value_key = self.token_value_key();

        if let Ok(pairs) = form::parse_form_pairs(&request.body) {
            let field = |key: &str| {
                pairs
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.clone())
            };
            let name = field(name_key.as_str());
            let value = field(value_key.as_str());
            if let (Some(name), Some(value)) = (name, value) {
                return Some((name, value));
            }
        }

        match (
            request.header(&self.config.header_name),
            request.header(&self.config.header_value),
        ) {
            (Some(name), Some(value)) => Some((name.to_string(), value.to_string())),
            _ => None,
        }
    }

    fn forget_if_current(&mut self, name: &str) {
        if self.key_pair.as_ref().is_some_and(|p| p.name == name) {
            self.key_pair = None;
        }
    }
}
