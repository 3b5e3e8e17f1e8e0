// Rampart - request guards for Rust web applications
//
// The umbrella crate re-exports the member crates: the request view, the
// session state guards attach to, and the CSRF token guard itself.

pub use rampart_core;
pub use rampart_csrf;
pub use rampart_session;

pub use rampart_core::{HttpMethod, HttpRequest};
pub use rampart_csrf::{
    CsrfError, GuardConfig, RejectReason, Retention, TokenFields, TokenGuard, Verdict,
};
pub use rampart_session::{Session, SessionHandle};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        CsrfError, GuardConfig, HttpMethod, HttpRequest, RejectReason, Retention, Session,
        SessionHandle, TokenFields, TokenGuard, Verdict,
    };
    pub use rampart_csrf::{MemoryTokenStore, SessionTokenStore, TokenStore, shared};
}
