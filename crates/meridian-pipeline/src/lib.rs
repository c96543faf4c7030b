//! # Meridian Pipeline
//!
//! The invocation pipeline around a matched resource method.
//!
//! ```text
//! Request → pre-match filters → match → bind → request filters → invoke
//!                                                                  ↓
//! Response ← write ← response filters ← exception mappers ←────────┘
//! ```
//!
//! | Stage | Type | On failure |
//! |-------|------|------------|
//! | Pre-match filters | [`PreMatchFilter`] | filter's abort response |
//! | Match | [`RouteTable`](meridian_core::RouteTable) | 404 / 405 / 415 / 406 |
//! | Bind | [`Binder`](meridian_extract::Binder) | 400 / 415 |
//! | Request filters | [`RequestFilter`] | filter's abort response |
//! | Invoke | resource method | fault → [`ExceptionMapperRegistry`] |
//! | Response filters | [`ResponseFilter`] | - |
//! | Write | [`CodecRegistry`](meridian_codec::CodecRegistry) | 406 / 500 |
//!
//! Each request's progress is tracked as a [`DispatchState`]. A closed
//! [`ConnectionState`] stops response filters and the write.
//!
//! Generated error responses use the JSON envelope
//! `{"error": {"code", "message", "category"}, "request_id"}`; unmapped
//! faults never expose their message.

#![doc(html_root_url = "https://docs.rs/meridian-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod connection;
mod dispatcher;
mod filter;
mod mapper;
mod state;
mod suspension;
pub mod types;

pub use connection::ConnectionState;
pub use dispatcher::{Dispatcher, DispatcherBuilder, REQUEST_ID_HEADER};
pub use filter::{
    FilterAction, FnPreMatchFilter, FnRequestFilter, FnResponseFilter, PreMatchFilter,
    RequestFilter, ResponseFilter, DEFAULT_PRIORITY,
};
pub use mapper::{ExceptionMapper, ExceptionMapperRegistry, MappedFault};
pub use state::DispatchState;
pub use suspension::Suspender;
pub use types::{Request, Response, ResponseExt};
