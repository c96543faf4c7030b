//! # Meridian Extract
//!
//! Binds the parameters a resource method declares to values taken from the
//! request.
//!
//! | Source | Read from |
//! |--------|-----------|
//! | path | a captured template variable |
//! | query | the query string, repeated keys allowed |
//! | header | every value of the named header |
//! | matrix | `;k=v` on the path segments, last segment first |
//! | cookie | the `Cookie` headers |
//! | form | an `application/x-www-form-urlencoded` body |
//! | body | the body, decoded by the negotiated reader |
//! | bean | the bean's members, recursively |
//! | context | the header map or [`UriInfo`](meridian_core::UriInfo) |
//!
//! Values are percent-decoded unless the parameter is marked encoded, then
//! coerced to the declared [`ParamType`](meridian_core::ParamType). Any
//! failure is a [`BindingError`], which the pipeline answers with `400`, or
//! `415` when no reader accepts the body.

#![doc(html_root_url = "https://docs.rs/meridian-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binder;
mod coerce;
mod cookie;
mod error;

pub use binder::Binder;
pub use cookie::Cookies;
pub use error::{BindingError, BindingErrorKind};
