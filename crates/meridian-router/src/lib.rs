//! Route primitives for Meridian.
//!
//! This crate holds the pieces of request routing that do not depend on the
//! resource model:
//!
//! - **URI templates**: `/bookstore/{id}` and `/files/{path:.+}` compiled to
//!   anchored regular expressions with prefix matching for sub-resource
//!   locators
//! - **Request paths**: segment splitting with matrix parameters
//! - **Media types**: parsing, wildcard compatibility and `Accept` ordering
//! - **Route index**: root-segment buckets used to prune candidates
//! - **Method sets**: `Allow` header rendering
//!
//! # Example
//!
//! ```rust
//! use meridian_router::{MediaType, RequestPath, UriTemplate};
//!
//! let template = UriTemplate::parse("/bookstore/books/{id}").unwrap();
//! let path = RequestPath::parse("/bookstore/books/42;format=short");
//!
//! let matched = template.match_path(path.matching_path()).unwrap();
//! assert_eq!(matched.values.get("id"), Some("42"));
//! assert_eq!(path.matrix_param("format"), Some("short"));
//!
//! let accept = MediaType::parse_list(Some("application/json, */*;q=0.1")).unwrap();
//! assert_eq!(accept[0].essence(), "application/json");
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod index;
pub mod media;
mod methods;
mod params;
mod path;
pub mod template;

pub use error::{MediaTypeError, TemplateError};
pub use index::RouteIndex;
pub use media::MediaType;
pub use methods::MethodSet;
pub use params::Params;
pub use path::{percent_decode, PathSegment, RequestPath};
pub use template::{TemplateMatch, TemplateVar, UriTemplate};
