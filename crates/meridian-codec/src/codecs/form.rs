//! `application/x-www-form-urlencoded` codec.

use bytes::Bytes;
use meridian_core::{Entity, EntityBody, TypeDescriptor};
use meridian_router::MediaType;
use serde_json::Value;

use crate::codec::{MessageReader, MessageWriter};
use crate::error::CodecError;

/// Reads and writes URL-encoded forms.
///
/// A flat JSON object whose values are all scalars can be written as a
/// form as well.
#[derive(Debug, Clone)]
pub struct FormCodec {
    media_types: Vec<MediaType>,
}

impl FormCodec {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            media_types: vec![MediaType::new("application", "x-www-form-urlencoded")],
        }
    }
}

impl Default for FormCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn form_fields(entity: &Entity) -> Option<Vec<(String, String)>> {
    match entity.body() {
        EntityBody::Form(fields) => Some(fields.clone()),
        EntityBody::Json(Value::Object(object)) => object
            .iter()
            .map(|(k, v)| scalar_text(v).map(|v| (k.clone(), v)))
            .collect(),
        _ => None,
    }
}

impl MessageReader for FormCodec {
    fn name(&self) -> &'static str {
        "form"
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
        let fields: Vec<(String, String)> =
            serde_urlencoded::from_bytes(body).map_err(|e| CodecError::decode(media_type, e))?;
        Ok(Entity::new(EntityBody::Form(fields), target.clone()))
    }
}

impl MessageWriter for FormCodec {
    fn name(&self) -> &'static str {
        "form"
    }

    fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn can_write(&self, entity: &Entity, _media_type: &MediaType) -> bool {
        form_fields(entity).is_some()
    }

    fn write(&self, entity: &Entity, media_type: &MediaType) -> Result<Bytes, CodecError> {
        let fields = form_fields(entity)
            .ok_or_else(|| CodecError::encode(media_type, "entity is not a flat form"))?;
        serde_urlencoded::to_string(&fields)
            .map(Bytes::from)
            .map_err(|e| CodecError::encode(media_type, e))
    }
}
