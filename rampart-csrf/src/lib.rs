//! # Rampart CSRF Protection
//!
//! Cross-Site Request Forgery (CSRF) protection using the synchronizer token
//! pattern: the server issues an unpredictable token, remembers it, and
//! refuses state-changing requests that do not echo it back.
//!
//! ## Features
//!
//! - **Single-use tokens** - consumed by the first successful validation
//! - **Persistent mode** - tokens survive validation for multi-form pages
//! - **Bounded storage** - oldest tokens are evicted past a configured limit
//! - **Pluggable storage** - in-memory, session-backed, or your own [`TokenStore`]
//! - **Constant-time comparison** - submitted values are compared with `subtle`
//! - **Form or header transport** - hidden inputs or an `X-CSRF-Name`/`X-CSRF-Value` pair
//!
//! ## Quick Start
//!
//! ```rust
//! use rampart_csrf::{GuardConfig, TokenGuard, Verdict};
//! use rampart_core::HttpRequest;
//!
//! let mut guard = TokenGuard::new(GuardConfig::new("csrf").with_storage_limit(5)).unwrap();
//!
//! // Embed the token in a form
//! let token = guard.get_token().unwrap();
//! assert_eq!(token.name_key, "csrf_name");
//! assert_eq!(token.value.len(), 32);
//!
//! // The browser posts it back
//! let request = HttpRequest::new("POST", "/items")
//!     .with_form(&token.pairs())
//!     .unwrap();
//! assert_eq!(guard.check(&request).unwrap(), Verdict::Accepted);
//!
//! // A replay fails: the token was consumed
//! assert!(!guard.validate(&request).unwrap());
//! ```
//!
//! ## Session Storage
//!
//! Tokens usually live in the user's session so they survive between the
//! request that renders a form and the one that submits it. A guard is
//! created per request around the same session handle.
//!
//! ```rust
//! use rampart_csrf::{GuardConfig, TokenGuard};
//! use rampart_core::HttpRequest;
//! use rampart_session::{Session, SessionHandle};
//! use std::time::Duration;
//!
//! let session = SessionHandle::new(Session::new("sess-1", Duration::from_secs(3600)));
//! let config = GuardConfig::new("csrf");
//!
//! // Request 1: render the form
//! let mut guard = TokenGuard::with_session(config.clone(), session.clone()).unwrap();
//! let token = guard.get_token().unwrap();
//!
//! // Request 2: handle the submission
//! let mut guard = TokenGuard::with_session(config, session).unwrap();
//! let request = HttpRequest::new("POST", "/items").with_form(&token.pairs()).unwrap();
//! assert!(guard.require(&request).is_ok());
//! ```
//!
//! ## Persistent Tokens
//!
//! ```rust
//! use rampart_csrf::{GuardConfig, TokenGuard};
//! use rampart_core::HttpRequest;
//!
//! let mut guard = TokenGuard::new(GuardConfig::new("csrf").persistent()).unwrap();
//! let token = guard.get_token().unwrap();
//! let request = HttpRequest::new("POST", "/items").with_form(&token.pairs()).unwrap();
//!
//! assert!(guard.validate(&request).unwrap());
//! assert!(guard.validate(&request).unwrap());
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod storage;
pub mod token;

pub use config::{GuardConfig, MIN_STRENGTH, Retention};
pub use error::{CsrfError, Result};
pub use guard::{RejectReason, TokenGuard, Verdict};
pub use storage::{
    MemoryTokenStore, OrderedTokenStore, SessionTokenStore, SharedStore, TokenStore,
    UnorderedTokenStore, shared,
};
pub use token::{KeyPair, TokenFields};
