//! `Cookie` header parsing.

use http::header::COOKIE;
use http::HeaderMap;

/// Request cookies in header order.
///
/// Every `Cookie` header is read. When a name repeats, [`Cookies::get`]
/// returns the first occurrence.
///
/// # Example
///
/// ```rust
/// use http::{HeaderMap, HeaderValue};
/// use meridian_extract::Cookies;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(http::header::COOKIE, HeaderValue::from_static("session=abc123; theme=\"dark\""));
///
/// let cookies = Cookies::from_headers(&headers);
/// assert_eq!(cookies.get("session"), Some("abc123"));
/// assert_eq!(cookies.get("theme"), Some("dark"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    cookies: Vec<(String, String)>,
}

impl Cookies {
    /// Parses all `Cookie` headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Vec::new();
        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            cookies.extend(Self::parse(value));
        }
        Self { cookies }
    }

    fn parse(header_value: &str) -> impl Iterator<Item = (String, String)> + '_ {
        header_value.split(';').filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
    }

    /// The first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.cookies
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true if there are no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
