//! # Meridian Codec
//!
//! Message body readers and writers.
//!
//! A [`CodecRegistry`] holds [`MessageReader`]s and [`MessageWriter`]s and
//! picks one per request from the negotiated media type:
//!
//! | Codec | Media types |
//! |-------|-------------|
//! | [`JsonCodec`] | `application/json`, `application/*+json` |
//! | [`TextCodec`] | `text/plain` |
//! | [`FormCodec`] | `application/x-www-form-urlencoded` |
//! | [`OctetStreamCodec`] | `application/octet-stream`, `*/*` |
//!
//! Custom codecs are registered after the defaults and win over them only
//! through a more specific media type pattern.

#![doc(html_root_url = "https://docs.rs/meridian-codec/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod codec;
mod codecs;
mod error;
mod registry;

pub use codec::{MessageReader, MessageWriter};
pub use codecs::{FormCodec, JsonCodec, OctetStreamCodec, TextCodec};
pub use error::CodecError;
pub use registry::{CodecRegistry, NegotiatedReader, NegotiatedRepresentation, NegotiatedWriter};
