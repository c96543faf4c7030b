//! Request path parsing.
//!
//! Splits a raw request path into segments and separates the matrix
//! parameters (`;key=value`) carried on each segment. Template matching runs
//! against the path with matrix parameters removed.

use std::borrow::Cow;

use smallvec::SmallVec;

/// One segment of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// The segment text without matrix parameters, still percent-encoded.
    pub path: String,
    /// Matrix parameters in the order they appear.
    pub matrix: Vec<(String, String)>,
}

/// A parsed request path.
///
/// # Example
///
/// ```rust
/// use meridian_router::RequestPath;
///
/// let path = RequestPath::parse("/books;author=smith/chapters;n=2");
/// assert_eq!(path.matching_path(), "/books/chapters");
/// assert_eq!(path.matrix_param("n"), Some("2"));
/// assert_eq!(path.matrix_param("author"), Some("smith"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    raw: String,
    segments: SmallVec<[PathSegment; 8]>,
    matching: String,
}

impl RequestPath {
    /// Parses a raw path. An empty path is treated as `/`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = if raw.is_empty() { "/" } else { raw };
        let segments: SmallVec<[PathSegment; 8]> = raw
            .trim_start_matches('/')
            .split('/')
            .map(parse_segment)
            .collect();

        let mut matching = String::with_capacity(raw.len());
        for segment in &segments {
            matching.push('/');
            matching.push_str(&segment.path);
        }

        Self {
            raw: raw.to_string(),
            segments,
            matching,
        }
    }

    /// The path exactly as received.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The path with matrix parameters stripped, used for template matching.
    #[must_use]
    pub fn matching_path(&self) -> &str {
        &self.matching
    }

    /// The parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Looks up a matrix parameter, starting at the last segment.
    ///
    /// The matched resource is addressed by the final segment, so its
    /// parameters shadow those given earlier in the path.
    #[must_use]
    pub fn matrix_param(&self, name: &str) -> Option<&str> {
        self.segments.iter().rev().find_map(|segment| {
            segment
                .matrix
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        })
    }

    /// All values for a matrix parameter, last segment first.
    pub fn matrix_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.segments.iter().rev().flat_map(move |segment| {
            segment
                .matrix
                .iter()
                .filter(move |(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        })
    }

    /// Values for a matrix parameter carried on the given segments, visited
    /// in the order given. Out of range indexes are skipped.
    pub fn matrix_values_at<'a, I>(
        &'a self,
        segments: I,
        name: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a
    where
        I: IntoIterator<Item = usize>,
        I::IntoIter: 'a,
    {
        segments
            .into_iter()
            .filter_map(|index| self.segments.get(index))
            .flat_map(move |segment| {
                segment
                    .matrix
                    .iter()
                    .filter(move |(k, _)| k == name)
                    .map(|(_, v)| v.as_str())
            })
    }
}

fn parse_segment(segment: &str) -> PathSegment {
    let mut parts = segment.split(';');
    let path = parts.next().unwrap_or_default().to_string();
    let matrix = parts
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (p.to_string(), String::new()),
        })
        .collect();
    PathSegment { path, matrix }
}

/// Percent-decodes a path value. Invalid sequences are returned unchanged.
///
/// Unlike form decoding, `+` is kept as a literal plus sign.
#[must_use]
pub fn percent_decode(value: &str) -> Cow<'_, str> {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(value),
    }
}
