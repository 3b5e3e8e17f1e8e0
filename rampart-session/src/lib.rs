//! Session state for Rampart guards.
//!
//! Issuing session cookies and generating session identifiers is the job of
//! the host's session layer. This crate only models the state that layer
//! hands to each request: a [`Session`] behind a cloneable [`SessionHandle`].
//!
//! # Examples
//!
//! ```
//! use rampart_session::{Session, SessionHandle};
//! use std::time::Duration;
//!
//! let handle = SessionHandle::new(Session::new("sess-42", Duration::from_secs(3600)));
//!
//! handle.lock().set("user_id", 123).unwrap();
//! let user_id: Option<i32> = handle.lock().get("user_id").unwrap();
//! assert_eq!(user_id, Some(123));
//! ```

pub mod error;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use session::{Session, SessionHandle};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::session::{Session, SessionHandle};
}
