//! Responses produced by resource methods, filters and exception mappers.
//!
//! A [`ResourceResponse`] is still typed: its entity has not been written
//! yet. The pipeline selects a writer for it after the response filters run.

use http::header::{HeaderName, HeaderValue, LOCATION};
use http::{HeaderMap, StatusCode};
use meridian_router::MediaType;

use crate::entity::Entity;

/// A status, headers and an optional entity awaiting serialization.
///
/// # Example
///
/// ```
/// use meridian_core::{Entity, ResourceResponse};
/// use http::StatusCode;
///
/// let response = ResourceResponse::ok(Entity::text("hello"))
///     .header("x-source", "catalog");
///
/// assert_eq!(response.status_code(), StatusCode::OK);
/// assert_eq!(response.header_str("x-source"), Some("catalog"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    status: StatusCode,
    headers: HeaderMap,
    entity: Option<Entity>,
    media_type: Option<MediaType>,
}

impl ResourceResponse {
    /// A response with the given status and nothing else.
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            entity: None,
            media_type: None,
        }
    }

    /// `200 OK` with an entity.
    #[must_use]
    pub fn ok(entity: Entity) -> Self {
        Self::status(StatusCode::OK).with_entity(entity)
    }

    /// `201 Created` with a `Location` header.
    #[must_use]
    pub fn created(location: &str) -> Self {
        Self::status(StatusCode::CREATED).header(LOCATION, location)
    }

    /// `204 No Content`.
    #[must_use]
    pub fn no_content() -> Self {
        Self::status(StatusCode::NO_CONTENT)
    }

    /// Sets the entity.
    #[must_use]
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Forces the response media type instead of negotiating one.
    #[must_use]
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    /// Adds a header. Names or values that are not valid HTTP are dropped
    /// with a warning.
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!("dropping invalid response header"),
        }
        self
    }

    /// The status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Replaces the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A header value as a string.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The entity, if any.
    #[must_use]
    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    /// Replaces the entity.
    pub fn set_entity(&mut self, entity: Option<Entity>) {
        self.entity = entity;
    }

    /// Removes and returns the entity.
    pub fn take_entity(&mut self) -> Option<Entity> {
        self.entity.take()
    }

    /// The forced media type, if any.
    #[must_use]
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }
}

impl From<Entity> for ResourceResponse {
    fn from(entity: Entity) -> Self {
        Self::ok(entity)
    }
}

impl From<StatusCode> for ResourceResponse {
    fn from(status: StatusCode) -> Self {
        Self::status(status)
    }
}
