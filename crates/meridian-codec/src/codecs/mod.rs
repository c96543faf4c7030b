//! Built-in codecs.

mod form;
mod json;
mod octet;
mod text;

pub use form::FormCodec;
pub use json::JsonCodec;
pub use octet::OctetStreamCodec;
pub use text::TextCodec;
