//! # Meridian
//!
//! **Annotation-free REST dispatch core**
//!
//! Meridian routes HTTP requests to resource methods registered through
//! builders instead of annotations:
//!
//! - **Route registry**: resource classes, sub-resource locators, beans and
//!   converters, validated once and frozen into a [`RouteTable`](core::RouteTable)
//! - **Matcher**: URI templates with regex variables, ranked by literal
//!   characters, variable count and media-type specificity
//! - **Parameter binder**: path, query, matrix, header, cookie, form, body,
//!   bean and context parameters coerced to declared types
//! - **Content negotiation**: readers and writers chosen by `Content-Type`
//!   and `Accept`
//! - **Invocation pipeline**: pre-match, request and response filters,
//!   exception mappers and request suspension
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meridian::prelude::*;
//!
//! struct Bookstore;
//!
//! async fn get_book(_: Arc<Bookstore>, args: Arguments, _: Arc<RequestContext>) -> HandlerResult {
//!     let id: i64 = args.value("id")?;
//!     Ok(ResourceResponse::ok(Entity::text(format!("book {id}"))))
//! }
//!
//! let mut registry = RouteRegistry::new();
//! registry.register(
//!     ResourceClass::new("/bookstore")
//!         .singleton(Arc::new(Bookstore))
//!         .operation(
//!             Operation::get("/{id}")
//!                 .produces("text/plain")
//!                 .param(ParameterSpec::path("id", ParamType::I64))
//!                 .handle(get_book),
//!         ),
//! )?;
//!
//! let config = ConfigLoader::new().with_defaults().with_env_prefix("MERIDIAN").load()?;
//! meridian::init_telemetry(&config)?;
//! let dispatcher = meridian::configure(registry.freeze()?, &config)?.build();
//! let response = dispatcher.dispatch(request).await;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → pre-match filters → match → bind → request filters → invoke
//!                                                                  ↓
//! Response ← write ← response filters ← exception mappers ←────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/meridian/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;

pub use app::{configure, init_telemetry};

// Re-export the member crates
pub use meridian_codec as codec;
pub use meridian_config as config;
pub use meridian_core as core;
pub use meridian_extract as extract;
pub use meridian_pipeline as pipeline;
pub use meridian_router as router;
pub use meridian_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use meridian::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Registration
    pub use meridian_core::{
        BeanSpec, ContextKind, Operation, ParamType, ParameterSpec, ResourceClass, RouteRegistry,
        RouteTable, TypeDescriptor,
    };

    // Handlers and their values
    pub use meridian_core::{
        AppFault, Arguments, Container, Entity, Fault, FaultType, HandlerResult, RequestContext,
        RequestParts, ResourceResponse, SuspensionRegistry, WebApplicationFault,
    };

    // Dispatch
    pub use meridian_pipeline::{
        ConnectionState, Dispatcher, DispatcherBuilder, ExceptionMapperRegistry, FilterAction,
        FnPreMatchFilter, FnRequestFilter, FnResponseFilter, PreMatchFilter, RequestFilter,
        ResponseFilter, Suspender,
    };

    pub use meridian_codec::CodecRegistry;
    pub use meridian_config::{ConfigLoader, MeridianConfig};
}
