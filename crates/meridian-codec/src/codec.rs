//! Reader and writer traits.

use bytes::Bytes;
use meridian_core::{Entity, TypeDescriptor};
use meridian_router::MediaType;

use crate::error::CodecError;

/// Turns a request body into an [`Entity`].
pub trait MessageReader: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Media type patterns this reader handles, most preferred first.
    fn media_types(&self) -> &[MediaType];

    /// Returns true if the reader can produce the target type.
    fn can_read(&self, _target: &TypeDescriptor, _media_type: &MediaType) -> bool {
        true
    }

    /// Reads a body.
    fn read(
        &self,
        body: &Bytes,
        media_type: &MediaType,
        target: &TypeDescriptor,
    ) -> Result<Entity, CodecError>;
}

/// Turns an [`Entity`] into response bytes.
pub trait MessageWriter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Media type patterns this writer produces, most preferred first.
    fn media_types(&self) -> &[MediaType];

    /// Returns true if the writer can represent the entity.
    fn can_write(&self, entity: &Entity, media_type: &MediaType) -> bool;

    /// Writes an entity.
    fn write(&self, entity: &Entity, media_type: &MediaType) -> Result<Bytes, CodecError>;
}
