//! Captured path variables.
//!
//! Values stay percent-encoded here; decoding is left to the binder so that
//! parameters marked as encoded can see the raw text.

use smallvec::SmallVec;

/// Captures stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Path variables captured while matching a request.
///
/// Sub-resource locators match in several passes; each pass appends its
/// captures, and [`Params::get`] returns the most recent value for a name.
///
/// # Example
///
/// ```rust
/// use meridian_router::Params;
///
/// let mut params = Params::new();
/// params.push("id", "123");
/// params.push("chapter", "7");
/// params.push("id", "124");
///
/// assert_eq!(params.get("id"), Some("124"));
/// assert_eq!(params.get_all("id").collect::<Vec<_>>(), vec!["123", "124"]);
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set sized for `capacity` captures.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: SmallVec::with_capacity(capacity),
        }
    }

    /// Appends a capture.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Appends every capture from another match pass.
    pub fn extend(&mut self, other: Params) {
        self.inner.extend(other.inner);
    }

    /// The most recently captured value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every captured value for `name`, in capture order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates captures in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
