//! Compiled URI templates.
//!
//! A template such as `/bookstore/{id}` or `/files/{path:.+}` is compiled into
//! a single anchored regular expression. Every template also accepts a
//! trailing remainder (`(/.*)?`), which is how sub-resource locators match a
//! prefix and hand the rest of the path to a second matching pass.

use std::fmt::Write as _;

use regex::Regex;

use crate::error::TemplateError;
use crate::params::Params;

/// Pattern used for captures that declare no regular expression.
const DEFAULT_CAPTURE: &str = "[^/]+?";

/// Name of the group holding the unmatched tail of the path.
const REMAINDER_GROUP: &str = "rest";

/// A named capture declared in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVar {
    name: String,
    pattern: Option<String>,
}

impl TemplateVar {
    /// The capture name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The custom regular expression, if one was declared.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Returns true if the capture uses a custom regular expression.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.pattern.is_some()
    }
}

#[derive(Debug)]
enum Piece {
    Literal(String),
    Var(TemplateVar),
}

/// A compiled URI template.
///
/// # Example
///
/// ```rust
/// use meridian_router::UriTemplate;
///
/// let template = UriTemplate::parse("/bookstore/{id}").unwrap();
/// let matched = template.match_path("/bookstore/123").unwrap();
///
/// assert!(matched.is_full());
/// assert_eq!(matched.values.get("id"), Some("123"));
/// assert_eq!(template.literal_segments(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct UriTemplate {
    source: String,
    shape: String,
    regex: Regex,
    vars: Vec<TemplateVar>,
    groups: Vec<String>,
    literal_chars: usize,
    literal_segments: usize,
    root_literal: Option<String>,
}

impl UriTemplate {
    /// Compiles a template.
    ///
    /// A leading `/` is added when missing and trailing slashes are ignored,
    /// so `books/`, `/books` and `/books/` compile to the same template.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for unbalanced braces, empty or duplicate
    /// capture names, and custom patterns that do not compile.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let source = normalize(template);
        let body = source.trim_end_matches('/');
        let pieces = split_pieces(&source, body)?;

        let mut pattern = String::from("^");
        let mut shape = String::with_capacity(body.len());
        let mut vars: Vec<TemplateVar> = Vec::new();
        let mut groups = Vec::new();
        let mut literal_chars = 0;

        for piece in pieces {
            match piece {
                Piece::Literal(text) => {
                    literal_chars += text.chars().count();
                    pattern.push_str(&regex::escape(&text));
                    shape.push_str(&text);
                }
                Piece::Var(var) => {
                    if vars.iter().any(|v| v.name == var.name) {
                        return Err(TemplateError::DuplicateName {
                            template: source.clone(),
                            name: var.name,
                        });
                    }
                    let capture = match &var.pattern {
                        Some(custom) => {
                            Regex::new(&format!("^(?:{custom})$")).map_err(|e| {
                                TemplateError::InvalidRegex {
                                    template: source.clone(),
                                    name: var.name.clone(),
                                    reason: e.to_string(),
                                }
                            })?;
                            custom.as_str()
                        }
                        None => DEFAULT_CAPTURE,
                    };
                    match &var.pattern {
                        Some(custom) => {
                            let _ = write!(shape, "{{:{custom}}}");
                        }
                        None => shape.push_str("{}"),
                    }
                    let group = format!("v{}", groups.len());
                    let _ = write!(pattern, "(?P<{group}>{capture})");
                    groups.push(group);
                    vars.push(var);
                }
            }
        }
        let _ = write!(pattern, "(?P<{REMAINDER_GROUP}>/.*)?$");

        let regex = Regex::new(&pattern).map_err(|e| TemplateError::InvalidRegex {
            template: source.clone(),
            name: vars.last().map(|v| v.name.clone()).unwrap_or_default(),
            reason: e.to_string(),
        })?;

        let segments = top_level_segments(body);
        let literal_segments = segments
            .iter()
            .filter(|s| !s.is_empty() && !s.contains('{'))
            .count();
        let root_literal = segments
            .first()
            .filter(|s| !s.is_empty() && !s.contains('{'))
            .map(|s| (*s).to_string());

        if shape.is_empty() {
            shape.push('/');
        }

        Ok(Self {
            source,
            shape,
            regex,
            vars,
            groups,
            literal_chars,
            literal_segments,
            root_literal,
        })
    }

    /// Matches a request path, returning the captured values and remainder.
    ///
    /// Values are returned as they appear in the path, still percent-encoded.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<TemplateMatch> {
        let caps = self.regex.captures(path)?;
        let mut values = Params::with_capacity(self.vars.len());
        for (var, group) in self.vars.iter().zip(&self.groups) {
            let value = caps.name(group).map_or("", |m| m.as_str());
            values.push(var.name.as_str(), value);
        }
        let remainder = caps
            .name(REMAINDER_GROUP)
            .map_or_else(String::new, |m| m.as_str().to_string());
        Some(TemplateMatch { values, remainder })
    }

    /// The normalized template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The template with capture names removed and trailing slashes
    /// trimmed: `/books/{id}/{rest:.*}` becomes `/books/{}/{:.*}`.
    ///
    /// Two templates with the same shape match exactly the same paths.
    #[must_use]
    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// Captures in declaration order.
    #[must_use]
    pub fn variables(&self) -> &[TemplateVar] {
        &self.vars
    }

    /// Returns true if the template declares a capture with this name.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v.name == name)
    }

    /// Number of characters outside capture groups.
    #[must_use]
    pub fn literal_chars(&self) -> usize {
        self.literal_chars
    }

    /// Number of path segments that contain no capture at all.
    #[must_use]
    pub fn literal_segments(&self) -> usize {
        self.literal_segments
    }

    /// Total number of captures.
    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.vars.len()
    }

    /// Number of captures that declare a custom regular expression.
    #[must_use]
    pub fn regex_captures(&self) -> usize {
        self.vars.iter().filter(|v| v.is_custom()).count()
    }

    /// The first path segment, when it is entirely literal.
    #[must_use]
    pub fn root_literal(&self) -> Option<&str> {
        self.root_literal.as_deref()
    }
}

impl PartialEq for UriTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for UriTemplate {}

impl std::fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// The result of matching a path against a [`UriTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// Captured values, still percent-encoded.
    pub values: Params,
    /// The unmatched tail of the path, empty or starting with `/`.
    pub remainder: String,
}

impl TemplateMatch {
    /// Returns true if the template consumed the whole path.
    ///
    /// A lone trailing `/` still counts as a full match.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.remainder.is_empty() || self.remainder == "/"
    }
}

/// Joins a base template and a relative one with exactly one `/` between them.
///
/// ```rust
/// use meridian_router::template::concat;
///
/// assert_eq!(concat("/bookstore/", "/books/{id}"), "/bookstore/books/{id}");
/// assert_eq!(concat("/", ""), "/");
/// ```
#[must_use]
pub fn concat(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (base.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => normalize(base),
        (false, false) => normalize(&format!("{base}/{path}")),
    }
}

fn normalize(template: &str) -> String {
    let trimmed = template.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn split_pieces(source: &str, body: &str) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = body.char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                let mut depth = 1usize;
                let mut inner = String::new();
                loop {
                    match chars.next() {
                        Some((_, '{')) => {
                            depth += 1;
                            inner.push('{');
                        }
                        Some((_, '}')) => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            inner.push('}');
                        }
                        Some((_, ch)) => inner.push(ch),
                        None => {
                            return Err(TemplateError::UnbalancedBraces {
                                template: source.to_string(),
                                offset,
                            })
                        }
                    }
                }
                pieces.push(Piece::Var(parse_var(source, &inner)?));
            }
            '}' => {
                return Err(TemplateError::UnbalancedBraces {
                    template: source.to_string(),
                    offset,
                })
            }
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

fn parse_var(source: &str, inner: &str) -> Result<TemplateVar, TemplateError> {
    let (name, pattern) = match inner.split_once(':') {
        Some((name, pattern)) => {
            let pattern = pattern.trim();
            let pattern = (!pattern.is_empty()).then(|| pattern.to_string());
            (name.trim(), pattern)
        }
        None => (inner.trim(), None),
    };
    if name.is_empty() {
        return Err(TemplateError::EmptyName {
            template: source.to_string(),
        });
    }
    Ok(TemplateVar {
        name: name.to_string(),
        pattern,
    })
}

// Splits on '/' outside of capture groups; custom patterns may contain slashes.
fn top_level_segments(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                if i > 0 {
                    segments.push(&body[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < body.len() {
        segments.push(&body[start..]);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_literal() {
        let t = UriTemplate::parse("/bookstore/books").unwrap();
        assert_eq!(t.as_str(), "/bookstore/books");
        assert_eq!(t.capture_count(), 0);
        assert_eq!(t.literal_segments(), 2);
        assert_eq!(t.literal_chars(), "/bookstore/books".len());
        assert_eq!(t.root_literal(), Some("bookstore"));
    }

    #[test]
    fn test_parse_adds_leading_slash() {
        let t = UriTemplate::parse("books/{id}").unwrap();
        assert_eq!(t.as_str(), "/books/{id}");
        assert!(t.match_path("/books/7").unwrap().is_full());
    }

    #[test]
    fn test_default_capture() {
        let t = UriTemplate::parse("/bookstore/{id}").unwrap();
        let m = t.match_path("/bookstore/123").unwrap();
        assert!(m.is_full());
        assert_eq!(m.values.get("id"), Some("123"));
        assert_eq!(t.regex_captures(), 0);
    }

    #[test]
    fn test_custom_capture_spans_segments() {
        let t = UriTemplate::parse("/bookstore/{any:.*}").unwrap();
        let m = t.match_path("/bookstore/a/b/c").unwrap();
        assert!(m.is_full());
        assert_eq!(m.values.get("any"), Some("a/b/c"));
        assert_eq!(t.regex_captures(), 1);
    }

    #[test]
    fn test_nested_braces_in_pattern() {
        let t = UriTemplate::parse(r"/isbn/{code:\d{3}}").unwrap();
        assert!(t.match_path("/isbn/123").unwrap().is_full());
        assert!(t.match_path("/isbn/12").is_none());
    }

    #[test]
    fn test_prefix_match_leaves_remainder() {
        let t = UriTemplate::parse("/bookstore/books/{id}").unwrap();
        let m = t.match_path("/bookstore/books/5/chapters/2").unwrap();
        assert!(!m.is_full());
        assert_eq!(m.remainder, "/chapters/2");
        assert_eq!(m.values.get("id"), Some("5"));
    }

    #[test]
    fn test_trailing_slash_is_full_match() {
        let t = UriTemplate::parse("/bookstore/").unwrap();
        assert_eq!(t.as_str(), "/bookstore/");
        assert!(t.match_path("/bookstore").unwrap().is_full());
        assert!(t.match_path("/bookstore/").unwrap().is_full());
        assert!(t.match_path("/bookstorex").is_none());
    }

    #[test]
    fn test_root_template() {
        let t = UriTemplate::parse("/").unwrap();
        assert!(t.match_path("/").unwrap().is_full());
        let m = t.match_path("/books").unwrap();
        assert_eq!(m.remainder, "/books");
        assert_eq!(t.root_literal(), None);
    }

    #[test]
    fn test_mixed_segment_is_not_literal() {
        let t = UriTemplate::parse("/books/item-{id}/cover").unwrap();
        assert_eq!(t.literal_segments(), 2);
        assert_eq!(t.root_literal(), Some("books"));
        let m = t.match_path("/books/item-42/cover").unwrap();
        assert_eq!(m.values.get("id"), Some("42"));
    }

    #[test]
    fn test_shape_ignores_capture_names() {
        let a = UriTemplate::parse("/books/{a}/").unwrap();
        let b = UriTemplate::parse("/books/{b}").unwrap();
        assert_eq!(a.shape(), "/books/{}");
        assert_eq!(a.shape(), b.shape());

        let custom = UriTemplate::parse(r"/isbn/{code:\d{3}}").unwrap();
        assert_eq!(custom.shape(), r"/isbn/{:\d{3}}");
        assert_ne!(custom.shape(), UriTemplate::parse("/isbn/{code}").unwrap().shape());
        assert_eq!(UriTemplate::parse("/").unwrap().shape(), "/");
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(matches!(
            UriTemplate::parse("/books/{id"),
            Err(TemplateError::UnbalancedBraces { .. })
        ));
        assert!(matches!(
            UriTemplate::parse("/books/id}"),
            Err(TemplateError::UnbalancedBraces { .. })
        ));
    }

    #[test]
    fn test_empty_name() {
        assert!(matches!(
            UriTemplate::parse("/books/{}"),
            Err(TemplateError::EmptyName { .. })
        ));
        assert!(matches!(
            UriTemplate::parse(r"/books/{:\d+}"),
            Err(TemplateError::EmptyName { .. })
        ));
    }

    #[test]
    fn test_duplicate_name() {
        let err = UriTemplate::parse("/a/{id}/b/{id}").unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateName { ref name, .. } if name == "id"));
        assert_eq!(err.template(), "/a/{id}/b/{id}");
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            UriTemplate::parse("/a/{id:[0-9}"),
            Err(TemplateError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_literal_chars_are_escaped() {
        let t = UriTemplate::parse("/v1.0/books").unwrap();
        assert!(t.match_path("/v1.0/books").is_some());
        assert!(t.match_path("/v1x0/books").is_none());
    }

    #[test]
    fn test_concat() {
        assert_eq!(concat("/bookstore", "books"), "/bookstore/books");
        assert_eq!(concat("/bookstore/", "/books/"), "/bookstore/books/");
        assert_eq!(concat("", "books"), "/books");
        assert_eq!(concat("/bookstore", ""), "/bookstore");
        assert_eq!(concat("", ""), "/");
    }

    proptest! {
        #[test]
        fn literal_template_matches_only_itself(
            a in "[a-z]{1,8}",
            b in "[a-z]{1,8}",
            other in "[a-z]{1,8}",
        ) {
            let path = format!("/{a}/{b}");
            let t = UriTemplate::parse(&path).unwrap();
            prop_assert!(t.match_path(&path).unwrap().is_full());
            if other != b {
                let miss = format!("/{a}/{other}");
                prop_assert!(t.match_path(&miss).is_none());
            }
        }

        #[test]
        fn captured_segment_round_trips(id in "[A-Za-z0-9_-]{1,16}") {
            let t = UriTemplate::parse("/items/{id}").unwrap();
            let m = t.match_path(&format!("/items/{id}")).unwrap();
            prop_assert!(m.is_full());
            prop_assert_eq!(m.values.get("id"), Some(id.as_str()));
        }
    }
}
