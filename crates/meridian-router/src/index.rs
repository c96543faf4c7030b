//! Root-segment index used to prune match candidates.
//!
//! Routes whose template starts with a literal segment are bucketed by that
//! segment; the buckets are kept sorted so lookup is a binary search.
//! Routes that start with a capture can match any root and are always
//! candidates.

/// Index from the first path segment to route ids.
///
/// Ids are returned in ascending order, which callers use as registration
/// order.
///
/// # Example
///
/// ```rust
/// use meridian_router::RouteIndex;
///
/// let mut index = RouteIndex::new();
/// index.insert(Some("bookstore"), 0);
/// index.insert(None, 1);
/// index.insert(Some("library"), 2);
///
/// assert_eq!(index.candidates("/bookstore/books/1"), vec![0, 1]);
/// assert_eq!(index.candidates("/library"), vec![1, 2]);
/// assert_eq!(index.candidates("/other"), vec![1]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteIndex {
    literal: Vec<(String, Vec<usize>)>,
    dynamic: Vec<usize>,
    len: usize,
}

impl RouteIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route under its literal root segment, or as dynamic when `None`.
    pub fn insert(&mut self, root: Option<&str>, id: usize) {
        let bucket = match root {
            Some(segment) => {
                match self
                    .literal
                    .binary_search_by(|(s, _)| s.as_str().cmp(segment))
                {
                    Ok(pos) => &mut self.literal[pos].1,
                    Err(pos) => {
                        self.literal.insert(pos, (segment.to_string(), Vec::new()));
                        &mut self.literal[pos].1
                    }
                }
            }
            None => &mut self.dynamic,
        };
        if let Err(pos) = bucket.binary_search(&id) {
            bucket.insert(pos, id);
            self.len += 1;
        }
    }

    /// Route ids that could match `path`, in ascending order.
    #[must_use]
    pub fn candidates(&self, path: &str) -> Vec<usize> {
        let root = root_segment(path);
        let literal: &[usize] = self
            .literal
            .binary_search_by(|(s, _)| s.as_str().cmp(root))
            .map_or(&[][..], |pos| self.literal[pos].1.as_slice());
        merge_sorted(literal, &self.dynamic)
    }

    /// Number of indexed routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no routes are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn root_segment(path: &str) -> &str {
    let trimmed = path.trim_start_matches('/');
    trimmed.split('/').next().unwrap_or_default()
}

fn merge_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let index = RouteIndex::new();
        assert!(index.is_empty());
        assert!(index.candidates("/anything").is_empty());
    }

    #[test]
    fn test_literal_buckets_are_separate() {
        let mut index = RouteIndex::new();
        index.insert(Some("b"), 1);
        index.insert(Some("a"), 0);
        index.insert(Some("c"), 2);

        assert_eq!(index.candidates("/a/x"), vec![0]);
        assert_eq!(index.candidates("/b"), vec![1]);
        assert_eq!(index.candidates("/c/"), vec![2]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_dynamic_routes_always_candidates() {
        let mut index = RouteIndex::new();
        index.insert(None, 3);
        index.insert(Some("books"), 1);
        index.insert(None, 0);

        assert_eq!(index.candidates("/books/1"), vec![0, 1, 3]);
        assert_eq!(index.candidates("/"), vec![0, 3]);
    }

    #[test]
    fn test_duplicate_insert_ignored() {
        let mut index = RouteIndex::new();
        index.insert(Some("a"), 0);
        index.insert(Some("a"), 0);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_merge_sorted() {
        assert_eq!(merge_sorted(&[1, 4, 6], &[0, 2, 5]), vec![0, 1, 2, 4, 5, 6]);
        assert_eq!(merge_sorted(&[], &[3]), vec![3]);
    }
}
