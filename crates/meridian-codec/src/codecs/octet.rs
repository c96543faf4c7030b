//! Raw bytes for `application/octet-stream` and anything else unclaimed.

use bytes::Bytes;
use meridian_core::{Entity, EntityBody, TypeDescriptor};
use meridian_router::MediaType;

use crate::codec::{MessageReader, MessageWriter};
use crate::error::CodecError;

/// Passes bodies through untouched.
#[derive(Debug, Clone)]
pub struct OctetStreamCodec {
    media_types: Vec<MediaType>,
}

impl OctetStreamCodec {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            media_types: vec![
                MediaType::new("application", "octet-stream"),
                MediaType::wildcard(),
            ],
        }
    }
}

impl Default for OctetStreamCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageReader for OctetStreamCodec {
    fn name(&self) -> &'static str {
        "octet-stream"
    }

    fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn read(
        &self,
        body: &Bytes,
        _media_type: &MediaType,
        target: &TypeDescriptor,
    ) -> Result<Entity, CodecError> {
        Ok(Entity::new(EntityBody::Bytes(body.clone()), target.clone()))
    }
}

impl MessageWriter for OctetStreamCodec {
    fn name(&self) -> &'static str {
        "octet-stream"
    }

    fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn can_write(&self, entity: &Entity, _media_type: &MediaType) -> bool {
        matches!(
            entity.body(),
            EntityBody::Bytes(_) | EntityBody::Text(_) | EntityBody::Empty
        )
    }

    fn write(&self, entity: &Entity, media_type: &MediaType) -> Result<Bytes, CodecError> {
        match entity.body() {
            EntityBody::Bytes(bytes) => Ok(bytes.clone()),
            EntityBody::Text(text) => Ok(Bytes::from(text.clone())),
            EntityBody::Empty => Ok(Bytes::new()),
            EntityBody::Json(_) | EntityBody::Form(_) => {
                Err(CodecError::encode(media_type, "entity is not raw"))
            }
        }
    }
}
