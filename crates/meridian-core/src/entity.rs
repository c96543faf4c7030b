//! Request and response entities.
//!
//! An [`Entity`] pairs a body with a [`TypeDescriptor`]. The descriptor is
//! what lets a writer treat "a list of `Book`" differently from "a `Book`",
//! for instance by wrapping collections under their element name.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Describes the declared type of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// No entity.
    Unit,
    /// A single value of the named type.
    Single {
        /// Short type name, e.g. `Book`.
        name: String,
    },
    /// A collection whose elements are of the named type.
    Collection {
        /// Short element type name.
        element: String,
    },
    /// A parameterized type such as `Page<Book>`.
    Generic {
        /// The outer type name.
        raw: String,
        /// Type arguments in declaration order.
        args: Vec<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    /// Descriptor for a single `T`.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self::Single {
            name: short_type_name::<T>(),
        }
    }

    /// Descriptor for a collection of `T`.
    #[must_use]
    pub fn collection_of<T>() -> Self {
        Self::Collection {
            element: short_type_name::<T>(),
        }
    }

    /// Descriptor for a named single type.
    pub fn single(name: impl Into<String>) -> Self {
        Self::Single { name: name.into() }
    }

    /// Descriptor for a collection of a named element type.
    pub fn collection(element: impl Into<String>) -> Self {
        Self::Collection {
            element: element.into(),
        }
    }

    /// The element type name for collections, if any.
    #[must_use]
    pub fn element(&self) -> Option<&str> {
        match self {
            Self::Collection { element } => Some(element),
            _ => None,
        }
    }

    /// Human readable name, e.g. `Book`, `List<Book>` or `Page<Book>`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Unit => "()".to_string(),
            Self::Single { name } => name.clone(),
            Self::Collection { element } => format!("List<{element}>"),
            Self::Generic { raw, args } => {
                let args: Vec<String> = args.iter().map(Self::display_name).collect();
                format!("{raw}<{}>", args.join(", "))
            }
        }
    }
}

/// The body of an entity in one of the shapes codecs understand.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityBody {
    /// No body.
    Empty,
    /// A structured value, written by JSON-capable codecs.
    Json(serde_json::Value),
    /// Plain text.
    Text(String),
    /// Opaque bytes.
    Bytes(Bytes),
    /// Form fields in order.
    Form(Vec<(String, String)>),
}

/// A typed entity.
///
/// # Example
///
/// ```
/// use meridian_core::{Entity, TypeDescriptor};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Book { id: i64 }
///
/// let books = Entity::collection(&[Book { id: 1 }, Book { id: 2 }]).unwrap();
/// assert_eq!(books.descriptor(), &TypeDescriptor::collection("Book"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    body: EntityBody,
    descriptor: TypeDescriptor,
}

impl Entity {
    /// Creates an entity from a body and descriptor.
    #[must_use]
    pub fn new(body: EntityBody, descriptor: TypeDescriptor) -> Self {
        Self { body, descriptor }
    }

    /// Serializes a single value.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if `value` cannot be represented.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            EntityBody::Json(serde_json::to_value(value)?),
            TypeDescriptor::of::<T>(),
        ))
    }

    /// Serializes a collection, keeping the element type.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if an item cannot be represented.
    pub fn collection<T: Serialize>(items: &[T]) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            EntityBody::Json(serde_json::to_value(items)?),
            TypeDescriptor::collection_of::<T>(),
        ))
    }

    /// A plain text entity.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(EntityBody::Text(text.into()), TypeDescriptor::single("String"))
    }

    /// A raw byte entity.
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self::new(EntityBody::Bytes(bytes.into()), TypeDescriptor::single("Bytes"))
    }

    /// A form entity.
    #[must_use]
    pub fn form(fields: Vec<(String, String)>) -> Self {
        Self::new(EntityBody::Form(fields), TypeDescriptor::single("Form"))
    }

    /// An empty entity.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(EntityBody::Empty, TypeDescriptor::Unit)
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &EntityBody {
        &self.body
    }

    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Replaces the descriptor.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Returns true for an empty body.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.body, EntityBody::Empty)
    }

    /// Deserializes the body into `T`.
    ///
    /// Text bodies are treated as a JSON string, and forms as an object of
    /// their fields (later values win).
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when the body does not fit `T`.
    pub fn to_value<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            EntityBody::Json(value) => T::deserialize(value),
            EntityBody::Text(text) => T::deserialize(serde_json::Value::String(text.clone())),
            EntityBody::Form(fields) => {
                let object: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                T::deserialize(serde_json::Value::Object(object))
            }
            EntityBody::Bytes(bytes) => serde_json::from_slice(bytes),
            EntityBody::Empty => T::deserialize(serde_json::Value::Null),
        }
    }
}

/// The last path component of a type name, without generic arguments.
fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Book {
        id: i64,
        title: String,
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Book>(), "Book");
        assert_eq!(short_type_name::<Vec<Book>>(), "Vec");
        assert_eq!(short_type_name::<i64>(), "i64");
    }

    #[test]
    fn test_json_entity() {
        let book = Book {
            id: 1,
            title: "CXF".into(),
        };
        let entity = Entity::json(&book).unwrap();
        assert_eq!(entity.descriptor(), &TypeDescriptor::single("Book"));
        assert_eq!(entity.to_value::<Book>().unwrap(), book);
    }

    #[test]
    fn test_collection_entity() {
        let entity = Entity::collection(&[Book {
            id: 1,
            title: "a".into(),
        }])
        .unwrap();
        assert_eq!(entity.descriptor().element(), Some("Book"));
        assert_eq!(entity.descriptor().display_name(), "List<Book>");
    }

    #[test]
    fn test_generic_display() {
        let page = TypeDescriptor::Generic {
            raw: "Page".into(),
            args: vec![TypeDescriptor::single("Book")],
        };
        assert_eq!(page.display_name(), "Page<Book>");
        assert_eq!(page.element(), None);
    }

    #[test]
    fn test_text_and_form_to_value() {
        assert_eq!(Entity::text("hi").to_value::<String>().unwrap(), "hi");

        #[derive(Deserialize)]
        struct Login {
            user: String,
        }
        let form = Entity::form(vec![("user".into(), "bob".into())]);
        assert_eq!(form.to_value::<Login>().unwrap().user, "bob");
    }

    #[test]
    fn test_empty() {
        let entity = Entity::empty();
        assert!(entity.is_empty());
        assert_eq!(entity.to_value::<Option<Book>>().unwrap(), None);
    }
}
