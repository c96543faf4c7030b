//! Parameter declarations.
//!
//! A resource method lists [`ParameterSpec`]s in the order its arguments are
//! bound. Bean parameters point at a [`BeanSpec`] whose members are
//! themselves parameter specs, so binding a bean is the same procedure
//! applied one level down.

use indexmap::IndexMap;

use crate::entity::TypeDescriptor;

/// Where a parameter's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    /// A captured path variable.
    Path,
    /// The query string.
    Query,
    /// A request header.
    Header,
    /// A matrix parameter on the path.
    Matrix,
    /// A cookie.
    Cookie,
    /// A field of an `application/x-www-form-urlencoded` body.
    Form,
    /// The whole request body.
    Body,
    /// A value object assembled from several request parts.
    Bean,
    /// Request metadata rather than request data.
    Context,
}

impl ParamSource {
    /// Lowercase name used in messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Matrix => "matrix",
            Self::Cookie => "cookie",
            Self::Form => "form",
            Self::Body => "body",
            Self::Bean => "bean",
            Self::Context => "context",
        }
    }
}

/// Request metadata available to context parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Path, query and matched template information.
    UriInfo,
    /// The full request header map.
    Headers,
}

/// The type a parameter value is coerced to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Left as text.
    String,
    /// `true` or `false`.
    Bool,
    /// Exactly one character.
    Char,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
    /// 64-bit float.
    F64,
    /// Every value of a repeated parameter, each coerced to the inner type.
    List(Box<ParamType>),
    /// A type with a registered converter.
    Custom(String),
    /// A registered bean.
    Bean(String),
    /// A body decoded by the negotiated reader.
    Entity(TypeDescriptor),
    /// Request metadata.
    Context(ContextKind),
}

impl ParamType {
    /// A list of `inner`.
    #[must_use]
    pub fn list(inner: ParamType) -> Self {
        Self::List(Box::new(inner))
    }

    /// A custom type.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Custom converter names referenced by this type, if any.
    #[must_use]
    pub fn converter_name(&self) -> Option<&str> {
        match self {
            Self::Custom(name) => Some(name),
            Self::List(inner) => inner.converter_name(),
            _ => None,
        }
    }

    /// Short name used in messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Bool => "boolean".into(),
            Self::Char => "char".into(),
            Self::I32 => "i32".into(),
            Self::I64 => "i64".into(),
            Self::U32 => "u32".into(),
            Self::U64 => "u64".into(),
            Self::F64 => "f64".into(),
            Self::List(inner) => format!("list of {}", inner.describe()),
            Self::Custom(name) | Self::Bean(name) => name.clone(),
            Self::Entity(descriptor) => descriptor.display_name(),
            Self::Context(kind) => format!("{kind:?}"),
        }
    }
}

/// Declaration of one resource method argument.
///
/// # Example
///
/// ```
/// use meridian_core::{ParamSource, ParamType, ParameterSpec};
///
/// let limit = ParameterSpec::query("limit", ParamType::U32).default_value("20");
/// assert_eq!(limit.source(), ParamSource::Query);
/// assert_eq!(limit.default(), Some("20"));
/// assert!(!limit.is_required());
///
/// let id = ParameterSpec::path("id", ParamType::I64);
/// assert!(id.is_required());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSpec {
    source: ParamSource,
    name: String,
    field: Option<String>,
    target: ParamType,
    default: Option<String>,
    required: bool,
    encoded: bool,
}

impl ParameterSpec {
    fn new(source: ParamSource, name: impl Into<String>, target: ParamType) -> Self {
        Self {
            source,
            name: name.into(),
            field: None,
            target,
            default: None,
            required: false,
            encoded: false,
        }
    }

    /// A captured path variable. Always required.
    pub fn path(name: impl Into<String>, target: ParamType) -> Self {
        let mut spec = Self::new(ParamSource::Path, name, target);
        spec.required = true;
        spec
    }

    /// A query parameter.
    pub fn query(name: impl Into<String>, target: ParamType) -> Self {
        Self::new(ParamSource::Query, name, target)
    }

    /// A request header.
    pub fn header(name: impl Into<String>, target: ParamType) -> Self {
        Self::new(ParamSource::Header, name, target)
    }

    /// A matrix parameter.
    pub fn matrix(name: impl Into<String>, target: ParamType) -> Self {
        Self::new(ParamSource::Matrix, name, target)
    }

    /// A cookie.
    pub fn cookie(name: impl Into<String>, target: ParamType) -> Self {
        Self::new(ParamSource::Cookie, name, target)
    }

    /// A form field.
    pub fn form(name: impl Into<String>, target: ParamType) -> Self {
        Self::new(ParamSource::Form, name, target)
    }

    /// The request body. The source name is empty.
    #[must_use]
    pub fn body(descriptor: TypeDescriptor) -> Self {
        Self::new(ParamSource::Body, "", ParamType::Entity(descriptor))
    }

    /// A bean assembled from several request parts.
    pub fn bean(bean: impl Into<String>) -> Self {
        let bean = bean.into();
        Self::new(ParamSource::Bean, "", ParamType::Bean(bean.clone())).field(bean)
    }

    /// Request metadata.
    #[must_use]
    pub fn context(kind: ContextKind) -> Self {
        Self::new(ParamSource::Context, "", ParamType::Context(kind))
    }

    /// Value used when the parameter is absent.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Absent values become a `400 Bad Request` unless a default exists.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Skips percent-decoding.
    #[must_use]
    pub fn encoded(mut self) -> Self {
        self.encoded = true;
        self
    }

    /// Stores the value under a different key than the source name.
    /// Used for bean members whose field name differs from the parameter.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// The binding source.
    #[must_use]
    pub fn source(&self) -> ParamSource {
        self.source
    }

    /// The source name; empty for whole-object bindings.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key the bound value is stored under.
    #[must_use]
    pub fn key(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }

    /// The target type.
    #[must_use]
    pub fn target(&self) -> &ParamType {
        &self.target
    }

    /// The default value, if any.
    #[must_use]
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Returns true if absence is an error.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns true if percent-decoding is skipped.
    #[must_use]
    pub fn is_encoded(&self) -> bool {
        self.encoded
    }

    /// The bean this parameter refers to, for bean parameters.
    #[must_use]
    pub fn bean_name(&self) -> Option<&str> {
        match &self.target {
            ParamType::Bean(name) => Some(name),
            _ => None,
        }
    }
}

/// A value object assembled from annotated members.
///
/// # Example
///
/// ```
/// use meridian_core::{BeanSpec, ParamType, ParameterSpec};
///
/// let search = BeanSpec::new("BookSearch")
///     .member(ParameterSpec::query("author", ParamType::String))
///     .member(ParameterSpec::header("X-Year", ParamType::I32).field("year"));
///
/// assert_eq!(search.members().len(), 2);
/// assert_eq!(search.members()[1].key(), "year");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanSpec {
    name: String,
    members: Vec<ParameterSpec>,
}

impl BeanSpec {
    /// Creates an empty bean.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Adds a member.
    #[must_use]
    pub fn member(mut self, spec: ParameterSpec) -> Self {
        self.members.push(spec);
        self
    }

    /// The bean name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in binding order.
    #[must_use]
    pub fn members(&self) -> &[ParameterSpec] {
        &self.members
    }
}

/// Registered beans, by name.
#[derive(Debug, Clone, Default)]
pub struct BeanRegistry {
    beans: IndexMap<String, BeanSpec>,
}

impl BeanRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bean, replacing any bean with the same name.
    pub fn register(&mut self, bean: BeanSpec) {
        self.beans.insert(bean.name.clone(), bean);
    }

    /// Looks up a bean.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BeanSpec> {
        self.beans.get(name)
    }

    /// Iterates beans in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BeanSpec> {
        self.beans.values()
    }

    /// Finds a cycle in the bean graph.
    ///
    /// Returns the names along the cycle with the first repeated at the end.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit<'a>(
            registry: &'a BeanRegistry,
            name: &'a str,
            marks: &mut IndexMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(name).copied().unwrap_or(Mark::Unvisited) {
                Mark::Done => return None,
                Mark::InProgress => {
                    let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|n| (*n).to_string()).collect();
                    cycle.push(name.to_string());
                    return Some(cycle);
                }
                Mark::Unvisited => {}
            }
            marks.insert(name, Mark::InProgress);
            stack.push(name);
            if let Some(bean) = registry.get(name) {
                for child in bean.members.iter().filter_map(ParameterSpec::bean_name) {
                    if let Some(cycle) = visit(registry, child, marks, stack) {
                        return Some(cycle);
                    }
                }
            }
            stack.pop();
            marks.insert(name, Mark::Done);
            None
        }

        let mut marks = IndexMap::new();
        let mut stack = Vec::new();
        self.beans
            .keys()
            .find_map(|name| visit(self, name, &mut marks, &mut stack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_has_empty_name() {
        let spec = ParameterSpec::body(TypeDescriptor::single("Book"));
        assert_eq!(spec.name(), "");
        assert_eq!(spec.source(), ParamSource::Body);
    }

    #[test]
    fn test_bean_key_is_bean_name() {
        let spec = ParameterSpec::bean("Search");
        assert_eq!(spec.key(), "Search");
        assert_eq!(spec.bean_name(), Some("Search"));
    }

    #[test]
    fn test_converter_name_through_list() {
        let ty = ParamType::list(ParamType::custom("Isbn"));
        assert_eq!(ty.converter_name(), Some("Isbn"));
        assert_eq!(ParamType::I64.converter_name(), None);
        assert_eq!(ty.describe(), "list of Isbn");
    }

    #[test]
    fn test_acyclic_beans() {
        let mut registry = BeanRegistry::new();
        registry.register(BeanSpec::new("Outer").member(ParameterSpec::bean("Inner")));
        registry.register(
            BeanSpec::new("Inner").member(ParameterSpec::query("q", ParamType::String)),
        );
        assert_eq!(registry.find_cycle(), None);
    }

    #[test]
    fn test_direct_cycle() {
        let mut registry = BeanRegistry::new();
        registry.register(BeanSpec::new("Node").member(ParameterSpec::bean("Node")));
        assert_eq!(
            registry.find_cycle(),
            Some(vec!["Node".to_string(), "Node".to_string()])
        );
    }

    #[test]
    fn test_indirect_cycle() {
        let mut registry = BeanRegistry::new();
        registry.register(BeanSpec::new("A").member(ParameterSpec::bean("B")));
        registry.register(BeanSpec::new("B").member(ParameterSpec::bean("C")));
        registry.register(BeanSpec::new("C").member(ParameterSpec::bean("A")));
        assert_eq!(
            registry.find_cycle(),
            Some(vec!["A".into(), "B".into(), "C".into(), "A".into()])
        );
    }
}
