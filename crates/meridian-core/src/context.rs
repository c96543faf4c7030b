//! Request context types.
//!
//! The [`RequestContext`] carries per-request state through the filters and
//! into resource methods: the request id, what was matched, named
//! properties set by filters, and typed extensions.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for one request easy to
/// correlate.
///
/// # Example
///
/// ```
/// use meridian_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request ID supplied by a client, e.g. from `x-request-id`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// What the matcher selected for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedResource {
    /// Name of the resource class that owns the method.
    pub class: String,
    /// Name of the resource method.
    pub method: String,
    /// The full template the request matched, locator segments included.
    pub template: String,
}

/// Per-request context shared by filters and resource methods.
///
/// Request filters receive it mutably and may record properties that the
/// resource method reads later; the resource method gets a shared handle.
///
/// # Example
///
/// ```
/// use meridian_core::RequestContext;
///
/// let mut ctx = RequestContext::new();
/// ctx.set_property("audit", true);
/// assert_eq!(ctx.property("audit"), Some(&serde_json::json!(true)));
/// assert!(ctx.flag("audit"));
/// ```
pub struct RequestContext {
    request_id: RequestId,
    started_at: Instant,
    matched: Option<MatchedResource>,
    properties: HashMap<String, serde_json::Value>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Creates a context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            matched: None,
            properties: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// The matched resource, once matching has happened.
    #[must_use]
    pub fn matched(&self) -> Option<&MatchedResource> {
        self.matched.as_ref()
    }

    /// Records the matched resource.
    pub fn set_matched(&mut self, matched: MatchedResource) {
        self.matched = Some(matched);
    }

    /// Sets a named property.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Returns a named property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }

    /// Returns true if the property is set to `true`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.properties.get(name), Some(serde_json::Value::Bool(true)))
    }

    /// Removes a named property, returning its value.
    pub fn remove_property(&mut self, name: &str) -> Option<serde_json::Value> {
        self.properties.remove(name)
    }

    /// Stores a typed extension, replacing any previous value of that type.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a typed extension.
    #[must_use]
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    /// Removes and returns a typed extension.
    pub fn take_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("matched", &self.matched)
            .field("properties", &self.properties)
            .field("extension_count", &self.extensions.len())
            .finish_non_exhaustive()
    }
}
