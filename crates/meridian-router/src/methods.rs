//! Sets of HTTP methods.
//!
//! Used to report which verbs a path supports when a request matches the
//! path but not the verb, and to build the `Allow` header.

use http::Method;
use smallvec::SmallVec;

/// Canonical order used when rendering an `Allow` header.
const ORDER: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// A de-duplicated set of HTTP methods.
///
/// # Example
///
/// ```rust
/// use meridian_router::MethodSet;
/// use http::Method;
///
/// let mut allowed = MethodSet::new();
/// allowed.insert(Method::POST);
/// allowed.insert(Method::GET);
/// allowed.insert(Method::GET);
///
/// assert!(allowed.contains(&Method::GET));
/// assert_eq!(allowed.with_implicit().allow_header(), "GET, POST, HEAD, OPTIONS");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    methods: SmallVec<[Method; 4]>,
}

impl MethodSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method if it is not already present.
    pub fn insert(&mut self, method: Method) {
        if !self.contains(&method) {
            self.methods.push(method);
        }
    }

    /// Returns true if the method is in the set.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Adds the methods the dispatcher answers on its own: `HEAD` when
    /// `GET` is present, and `OPTIONS` always.
    #[must_use]
    pub fn with_implicit(mut self) -> Self {
        if self.contains(&Method::GET) {
            self.insert(Method::HEAD);
        }
        self.insert(Method::OPTIONS);
        self
    }

    /// Methods in canonical order, extension methods last.
    #[must_use]
    pub fn sorted(&self) -> Vec<Method> {
        let mut known: Vec<Method> = ORDER
            .iter()
            .filter(|m| self.contains(m))
            .cloned()
            .collect();
        let mut extensions: Vec<Method> = self
            .methods
            .iter()
            .filter(|m| !ORDER.contains(m))
            .cloned()
            .collect();
        extensions.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        known.extend(extensions);
        known
    }

    /// Renders the set as an `Allow` header value.
    #[must_use]
    pub fn allow_header(&self) -> String {
        self.sorted()
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut set = Self::new();
        for method in iter {
            set.insert(method);
        }
        set
    }
}
