//! Converters for custom parameter types.
//!
//! Built-in scalar types are coerced by the binder. Any other type a
//! parameter declares as [`ParamType::Custom`](crate::ParamType::Custom)
//! needs a converter registered under the same name before the route table
//! is frozen.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// Converts one raw parameter value.
pub trait ParamConverter: Send + Sync + 'static {
    /// Converts `raw` into the value handed to the resource method.
    ///
    /// # Errors
    ///
    /// Returns a message describing why `raw` is not a valid value.
    fn convert(&self, raw: &str) -> Result<Value, String>;
}

impl<F> ParamConverter for F
where
    F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
{
    fn convert(&self, raw: &str) -> Result<Value, String> {
        self(raw)
    }
}

/// Converters by custom type name.
///
/// # Example
///
/// ```
/// use meridian_core::ConverterRegistry;
/// use std::net::Ipv4Addr;
///
/// let mut converters = ConverterRegistry::new();
/// converters.register_from_str::<Ipv4Addr>("Ipv4");
///
/// let value = converters.get("Ipv4").unwrap().convert("10.0.0.1").unwrap();
/// assert_eq!(value, serde_json::json!("10.0.0.1"));
/// assert!(converters.get("Ipv4").unwrap().convert("nope").is_err());
/// ```
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn ParamConverter>>,
}

impl ConverterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a converter, replacing any previous one for the name.
    pub fn register(&mut self, type_name: impl Into<String>, converter: impl ParamConverter) {
        self.converters
            .insert(type_name.into(), Arc::new(converter));
    }

    /// Registers a converter that parses with [`FromStr`] and serializes
    /// the result.
    pub fn register_from_str<T>(&mut self, type_name: impl Into<String>)
    where
        T: FromStr + Serialize + 'static,
        T::Err: fmt::Display,
    {
        self.register(type_name, |raw: &str| {
            let parsed = raw.parse::<T>().map_err(|e| e.to_string())?;
            serde_json::to_value(parsed).map_err(|e| e.to_string())
        });
    }

    /// Looks up a converter.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&dyn ParamConverter> {
        self.converters.get(type_name).map(AsRef::as_ref)
    }

    /// Returns true if a converter exists for the name.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.converters.contains_key(type_name)
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.converters.keys().collect();
        names.sort();
        f.debug_struct("ConverterRegistry")
            .field("types", &names)
            .finish()
    }
}
