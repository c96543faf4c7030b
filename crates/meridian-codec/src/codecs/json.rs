//! JSON codec.
//!
//! Handles `application/json` and any `+json` structured suffix. When
//! collection wrapping is on, a `List<Book>` is written as
//! `{"Book": [...]}` and read back from either shape.

use bytes::Bytes;
use meridian_core::{Entity, EntityBody, TypeDescriptor};
use meridian_router::MediaType;
use serde_json::{Map, Value};

use crate::codec::{MessageReader, MessageWriter};
use crate::error::CodecError;

/// Reads and writes JSON.
///
/// # Example
///
/// ```rust
/// use meridian_codec::{JsonCodec, MessageWriter};
/// use meridian_core::Entity;
/// use meridian_router::MediaType;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Book { id: i64 }
///
/// let codec = JsonCodec::new().wrap_collections(true);
/// let books = Entity::collection(&[Book { id: 1 }]).unwrap();
/// let bytes = codec.write(&books, &MediaType::parse("application/json").unwrap()).unwrap();
/// assert_eq!(bytes, r#"{"Book":[{"id":1}]}"#);
/// ```
#[derive(Debug, Clone)]
pub struct JsonCodec {
    media_types: Vec<MediaType>,
    wrap_collections: bool,
}

impl JsonCodec {
    /// Creates a codec that writes collections as bare arrays.
    #[must_use]
    pub fn new() -> Self {
        Self {
            media_types: vec![
                MediaType::new("application", "json"),
                MediaType::new("application", "*+json"),
            ],
            wrap_collections: false,
        }
    }

    /// Wraps collections under their element type name.
    #[must_use]
    pub fn wrap_collections(mut self, wrap: bool) -> Self {
        self.wrap_collections = wrap;
        self
    }

    fn unwrap_collection(value: Value, element: &str) -> Value {
        match value {
            Value::Object(mut object)
                if object.len() == 1 && object.get(element).is_some_and(Value::is_array) =>
            {
                object.remove(element).unwrap_or(Value::Null)
            }
            other => other,
        }
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageReader for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
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
        let value: Value =
            serde_json::from_slice(body).map_err(|e| CodecError::decode(media_type, e))?;
        let value = match target.element() {
            Some(element) => Self::unwrap_collection(value, element),
            None => value,
        };
        Ok(Entity::new(EntityBody::Json(value), target.clone()))
    }
}

impl MessageWriter for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn can_write(&self, entity: &Entity, _media_type: &MediaType) -> bool {
        matches!(
            entity.body(),
            EntityBody::Json(_) | EntityBody::Form(_) | EntityBody::Empty
        )
    }

    fn write(&self, entity: &Entity, media_type: &MediaType) -> Result<Bytes, CodecError> {
        let value = match entity.body() {
            EntityBody::Json(value) => value.clone(),
            EntityBody::Form(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            EntityBody::Empty => return Ok(Bytes::new()),
            EntityBody::Text(_) | EntityBody::Bytes(_) => {
                return Err(CodecError::encode(media_type, "entity is not structured"))
            }
        };
        let value = match entity.descriptor().element() {
            Some(element) if self.wrap_collections && value.is_array() => {
                let mut wrapper = Map::new();
                wrapper.insert(element.to_string(), value);
                Value::Object(wrapper)
            }
            _ => value,
        };
        serde_json::to_vec(&value)
            .map(Bytes::from)
            .map_err(|e| CodecError::encode(media_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Book {
        id: i64,
        name: String,
    }

    fn json() -> MediaType {
        MediaType::parse("application/json").unwrap()
    }

    #[test]
    fn test_read_single() {
        let codec = JsonCodec::new();
        let entity = codec
            .read(
                &Bytes::from_static(br#"{"id":123,"name":"CXF in Action"}"#),
                &json(),
                &TypeDescriptor::single("Book"),
            )
            .unwrap();
        assert_eq!(
            entity.to_value::<Book>().unwrap(),
            Book {
                id: 123,
                name: "CXF in Action".into()
            }
        );
    }

    #[test]
    fn test_read_malformed() {
        let target = TypeDescriptor::single("Book");
        let error = JsonCodec::new()
            .read(&Bytes::from_static(b"{"), &json(), &target)
            .unwrap_err();
        assert!(matches!(error, CodecError::Decode { .. }));
    }

    #[test]
    fn test_collection_unwrapped_on_read() {
        let codec = JsonCodec::new();
        let target = TypeDescriptor::collection("Book");
        let body = Bytes::from_static(br#"{"Book":[{"id":1,"name":"a"}]}"#);
        let wrapped = codec.read(&body, &json(), &target).unwrap();
        let bare = codec
            .read(&Bytes::from_static(br#"[{"id":1,"name":"a"}]"#), &json(), &target)
            .unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(wrapped.to_value::<Vec<Book>>().unwrap().len(), 1);
    }

    #[test]
    fn test_collection_written_bare_by_default() {
        let books = Entity::collection(&[Book {
            id: 1,
            name: "a".into(),
        }])
        .unwrap();
        let bytes = JsonCodec::new().write(&books, &json()).unwrap();
        assert_eq!(bytes, r#"[{"id":1,"name":"a"}]"#);
    }

    #[test]
    fn test_single_not_wrapped() {
        let book = Entity::json(&Book {
            id: 1,
            name: "a".into(),
        })
        .unwrap();
        let bytes = JsonCodec::new().wrap_collections(true).write(&book, &json()).unwrap();
        assert_eq!(bytes, r#"{"id":1,"name":"a"}"#);
    }

    #[test]
    fn test_cannot_write_text() {
        assert!(!JsonCodec::new().can_write(&Entity::text("x"), &json()));
    }
}
