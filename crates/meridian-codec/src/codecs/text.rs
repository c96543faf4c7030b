//! Plain text codec.

use bytes::Bytes;
use meridian_core::{Entity, EntityBody, TypeDescriptor};
use meridian_router::MediaType;
use serde_json::Value;

use crate::codec::{MessageReader, MessageWriter};
use crate::error::CodecError;

/// Reads and writes `text/plain` as UTF-8.
///
/// Scalar JSON values (strings, numbers and booleans) can also be written
/// as text.
#[derive(Debug, Clone)]
pub struct TextCodec {
    media_types: Vec<MediaType>,
}

impl TextCodec {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            media_types: vec![MediaType::new("text", "plain")],
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageReader for TextCodec {
    fn name(&self) -> &'static str {
        "text"
    }

    fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn read(
        &self,
        body: &Bytes,
        media_type: &MediaType,
        target: &TypeDescriptor,
    ) -> Result<Entity, CodecError> {
        let text = std::str::from_utf8(body).map_err(|e| CodecError::decode(media_type, e))?;
        Ok(Entity::new(EntityBody::Text(text.to_string()), target.clone()))
    }
}

impl MessageWriter for TextCodec {
    fn name(&self) -> &'static str {
        "text"
    }

    fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn can_write(&self, entity: &Entity, _media_type: &MediaType) -> bool {
        match entity.body() {
            EntityBody::Text(_) | EntityBody::Empty => true,
            EntityBody::Json(value) => matches!(
                value,
                Value::String(_) | Value::Number(_) | Value::Bool(_)
            ),
            EntityBody::Bytes(_) | EntityBody::Form(_) => false,
        }
    }

    fn write(&self, entity: &Entity, media_type: &MediaType) -> Result<Bytes, CodecError> {
        match entity.body() {
            EntityBody::Text(text) => Ok(Bytes::from(text.clone())),
            EntityBody::Empty => Ok(Bytes::new()),
            EntityBody::Json(Value::String(text)) => Ok(Bytes::from(text.clone())),
            EntityBody::Json(value @ (Value::Number(_) | Value::Bool(_))) => {
                Ok(Bytes::from(value.to_string()))
            }
            _ => Err(CodecError::encode(media_type, "entity is not textual")),
        }
    }
}
