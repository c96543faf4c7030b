//! Service container used to construct resource instances.
//!
//! Per-request resource classes receive the [`Container`] in their factory
//! and pull shared services out of it. Singleton resources can be stored in
//! the container directly and resolved by type.
//!
//! # Example
//!
//! ```
//! use meridian_core::di::Container;
//! use std::sync::Arc;
//!
//! struct BookRepository {
//!     dsn: String,
//! }
//!
//! let mut container = Container::new();
//! container.register(Arc::new(BookRepository { dsn: "memory://".into() }));
//!
//! let repo = container.resolve_required::<BookRepository>().unwrap();
//! assert_eq!(repo.dsn, "memory://");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A service could not be provided.
#[derive(Debug, Clone, Error)]
#[error("failed to inject {type_name}: {reason}")]
pub struct InjectionError {
    /// The type that could not be provided.
    pub type_name: &'static str,
    /// Why.
    pub reason: String,
}

impl InjectionError {
    /// The service was never registered.
    #[must_use]
    pub fn not_registered<T>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            reason: "service not registered".to_string(),
        }
    }

    /// Construction failed for another reason.
    pub fn custom<T>(reason: impl Into<String>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}

/// Shared services keyed by type.
#[derive(Default, Clone)]
pub struct Container {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service, replacing any previous service of the same type.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Resolves a service.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|service| Arc::clone(service).downcast::<T>().ok())
    }

    /// Resolves a service or reports it missing.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError`] if `T` was never registered.
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        self.resolve::<T>()
            .ok_or_else(InjectionError::not_registered::<T>)
    }

    /// Returns true if `T` is registered.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Catalog(u32);

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        container.register(Arc::new(Catalog(3)));
        assert!(container.contains::<Catalog>());
        assert_eq!(container.resolve::<Catalog>().unwrap().0, 3);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_missing_service() {
        let container = Container::new();
        let error = container.resolve_required::<Catalog>().unwrap_err();
        assert!(error.type_name.ends_with("Catalog"));
        assert!(error.to_string().contains("service not registered"));
    }

    #[test]
    fn test_register_replaces() {
        let mut container = Container::new();
        container.register(Arc::new(Catalog(1)));
        container.register(Arc::new(Catalog(2)));
        assert_eq!(container.resolve::<Catalog>().unwrap().0, 2);
        assert_eq!(container.len(), 1);
    }
}
