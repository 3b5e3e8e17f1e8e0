//! # Rampart Core
//!
//! Request view types consumed by the Rampart guards. This crate does not
//! route or serve requests; a host framework builds an [`HttpRequest`] (or
//! converts one from the `http` crate) and hands it to a guard.
//!
//! ```rust
//! use rampart_core::{HttpMethod, HttpRequest};
//!
//! let req = HttpRequest::new("POST", "/items")
//!     .with_form(&[("title", "Widget")])
//!     .unwrap();
//!
//! assert_eq!(req.http_method(), Some(HttpMethod::POST));
//! assert_eq!(req.form_field("title").as_deref(), Some("Widget"));
//! ```

pub mod error;
pub mod form;
pub mod http;
pub mod method;

pub use error::Error;
pub use http::HttpRequest;
pub use method::HttpMethod;
