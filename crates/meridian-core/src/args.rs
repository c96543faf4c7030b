//! Bound arguments handed to resource methods.

use http::HeaderMap;
use meridian_router::Params;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::entity::Entity;
use crate::fault::Fault;

/// Path and template information for context parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriInfo {
    /// The request path as received.
    pub path: String,
    /// The raw query string.
    pub query: Option<String>,
    /// Decoded path parameters.
    pub path_params: Params,
    /// The matched template, locator segments included.
    pub template: String,
}

/// One bound argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A coerced scalar, list or bean. Absent optionals are `Null` and
    /// absent lists are empty arrays.
    Value(Value),
    /// A decoded request body.
    Entity(Entity),
    /// The request headers.
    Headers(HeaderMap),
    /// Path information.
    Uri(UriInfo),
}

/// An argument was missing or of the wrong shape.
///
/// Raised by resource code reading [`Arguments`]; it means the declared
/// parameters and the method body disagree, so it surfaces as an unmapped
/// fault unless a mapper handles it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgumentError {
    /// No argument was bound under the key.
    #[error("no argument named '{0}'")]
    Missing(String),
    /// The argument could not be read as the requested type.
    #[error("argument '{name}' is not a {expected}: {reason}")]
    Type {
        /// The argument key.
        name: String,
        /// The requested type.
        expected: &'static str,
        /// Deserializer message.
        reason: String,
    },
}

impl Fault for ArgumentError {}

/// Arguments in declaration order, each under its parameter key.
///
/// # Example
///
/// ```
/// use meridian_core::{Argument, Arguments};
/// use serde_json::json;
///
/// let mut args = Arguments::new();
/// args.push("id", Argument::Value(json!(42)));
/// args.push("tag", Argument::Value(json!(null)));
///
/// assert_eq!(args.value::<i64>("id").unwrap(), 42);
/// assert_eq!(args.optional::<String>("tag").unwrap(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    items: Vec<(String, Argument)>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument.
    pub fn push(&mut self, key: impl Into<String>, argument: Argument) {
        self.items.push((key.into(), argument));
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The argument at a declaration position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.items.get(index).map(|(_, a)| a)
    }

    /// The first argument bound under `key`.
    #[must_use]
    pub fn by_name(&self, key: &str) -> Option<&Argument> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, a)| a)
    }

    /// Iterates `(key, argument)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.items.iter().map(|(k, a)| (k.as_str(), a))
    }

    /// Reads a value argument as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] if the key is unbound or does not fit `T`.
    pub fn value<T: DeserializeOwned>(&self, key: &str) -> Result<T, ArgumentError> {
        match self.by_name(key) {
            Some(Argument::Value(value)) => {
                T::deserialize(value).map_err(|e| type_error::<T>(key, &e))
            }
            Some(Argument::Entity(entity)) => {
                entity.to_value().map_err(|e| type_error::<T>(key, &e))
            }
            Some(_) => Err(ArgumentError::Type {
                name: key.to_string(),
                expected: std::any::type_name::<T>(),
                reason: "argument is request metadata".to_string(),
            }),
            None => Err(ArgumentError::Missing(key.to_string())),
        }
    }

    /// Reads an optional value argument; `Null` becomes `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] if the key is unbound or does not fit `T`.
    pub fn optional<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ArgumentError> {
        self.value::<Option<T>>(key)
    }

    /// Reads a bean argument as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] if the bean is unbound or does not fit `T`.
    pub fn bean<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArgumentError> {
        self.value(name)
    }

    /// The first entity argument.
    #[must_use]
    pub fn entity(&self) -> Option<&Entity> {
        self.items.iter().find_map(|(_, a)| match a {
            Argument::Entity(entity) => Some(entity),
            _ => None,
        })
    }

    /// Decodes the first entity argument as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] if there is no body or it does not fit `T`.
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, ArgumentError> {
        let entity = self
            .entity()
            .ok_or_else(|| ArgumentError::Missing("body".to_string()))?;
        entity.to_value().map_err(|e| type_error::<T>("body", &e))
    }

    /// The headers argument.
    #[must_use]
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.items.iter().find_map(|(_, a)| match a {
            Argument::Headers(headers) => Some(headers),
            _ => None,
        })
    }

    /// The path information argument.
    #[must_use]
    pub fn uri_info(&self) -> Option<&UriInfo> {
        self.items.iter().find_map(|(_, a)| match a {
            Argument::Uri(info) => Some(info),
            _ => None,
        })
    }
}

fn type_error<T>(key: &str, error: &serde_json::Error) -> ArgumentError {
    ArgumentError::Type {
        name: key.to_string(),
        expected: std::any::type_name::<T>(),
        reason: error.to_string(),
    }
}
