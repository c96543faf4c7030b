//! # Meridian Core
//!
//! The resource model and everything needed to pick a resource method for a
//! request:
//!
//! - [`ResourceClass`] and [`Operation`] builders declaring resources
//! - [`RouteRegistry`], which validates registrations and freezes them into
//!   an immutable [`RouteTable`]
//! - [`RouteTable::match_route`], which ranks candidates and returns a
//!   [`MatchCandidate`]
//! - [`Fault`] and [`AppFault`], the errors resource methods raise
//! - [`DispatchError`] and [`RegistrationError`]
//! - [`SuspensionRegistry`] for requests that wait to be resumed
//!
//! # Example
//!
//! ```
//! use meridian_core::{Entity, Operation, ParamType, ParameterSpec, ResourceClass, ResourceResponse, RouteRegistry};
//! use meridian_router::RequestPath;
//! use http::Method;
//! use std::sync::Arc;
//!
//! struct BookStore;
//!
//! let mut registry = RouteRegistry::new();
//! registry
//!     .register(
//!         ResourceClass::new("/bookstore")
//!             .singleton(Arc::new(BookStore))
//!             .operation(
//!                 Operation::get("/books/{id}")
//!                     .param(ParameterSpec::path("id", ParamType::I64))
//!                     .handle(|_: Arc<BookStore>, _, _| async {
//!                         Ok(ResourceResponse::ok(Entity::text("book")))
//!                     }),
//!             ),
//!     )
//!     .unwrap();
//! let table = registry.freeze().unwrap();
//!
//! let candidate = table
//!     .match_route(&Method::GET, &RequestPath::parse("/bookstore/books/7"), None, None, false)
//!     .unwrap();
//! assert_eq!(candidate.values.get("id"), Some("7"));
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod args;
mod context;
mod convert;
pub mod di;
mod entity;
mod error;
mod fault;
mod handler;
mod matcher;
mod model;
mod registry;
mod request;
mod resource;
mod response;
mod suspend;

pub use args::{Argument, ArgumentError, Arguments, UriInfo};
pub use context::{MatchedResource, RequestContext, RequestId};
pub use convert::{ConverterRegistry, ParamConverter};
pub use di::{Container, InjectionError};
pub use entity::{Entity, EntityBody, TypeDescriptor};
pub use error::{
    DispatchError, DispatchResult, ErrorCategory, ErrorDetail, ErrorEnvelope, RegistrationError,
};
pub use fault::{AppFault, Fault, FaultType, WebApplicationFault};
pub use handler::{
    BoxFuture, FnHandler, FnLocator, HandlerResult, Instance, InstanceMismatch, LocatorHandler,
    LocatorResult, MethodHandler,
};
pub use matcher::{ChainMatch, MatchCandidate, Specificity};
pub use model::{BeanRegistry, BeanSpec, ContextKind, ParamSource, ParamType, ParameterSpec};
pub use registry::{RegistrationResult, RouteRegistry, RouteTable};
pub use request::RequestParts;
pub use resource::{
    Invoker, Lifecycle, MethodKind, Operation, ResourceClass, ResourceMethod, SubResourceType,
};
pub use response::ResourceResponse;
pub use suspend::{SuspendError, SuspensionRegistry};
