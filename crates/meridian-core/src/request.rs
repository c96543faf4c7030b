//! The request as seen by the dispatch core.

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Method, Uri};
use meridian_router::RequestPath;

/// Method, URI, headers and a fully collected body.
///
/// Pre-match filters may rewrite the method and URI; the parsed path is kept
/// in step with the URI.
///
/// # Example
///
/// ```
/// use meridian_core::RequestParts;
/// use http::{HeaderMap, Method, Uri};
///
/// let request = RequestParts::new(
///     Method::GET,
///     Uri::from_static("/bookstore/books;lang=en?limit=5"),
///     HeaderMap::new(),
///     bytes::Bytes::new(),
/// );
///
/// assert_eq!(request.path().matching_path(), "/bookstore/books");
/// assert_eq!(request.query(), Some("limit=5"));
/// assert!(!request.has_body());
/// ```
#[derive(Debug, Clone)]
pub struct RequestParts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path: RequestPath,
}

impl RequestParts {
    /// Creates request parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let path = RequestPath::parse(uri.path());
        Self {
            method,
            uri,
            headers,
            body,
            path,
        }
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Replaces the method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// The request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Replaces the URI and reparses the path.
    pub fn set_uri(&mut self, uri: Uri) {
        self.path = RequestPath::parse(uri.path());
        self.uri = uri;
    }

    /// The parsed path.
    #[must_use]
    pub fn path(&self) -> &RequestPath {
        &self.path
    }

    /// The raw query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// The headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A header value as a string.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Every `Accept` header joined into one list.
    #[must_use]
    pub fn accept(&self) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// The collected body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns true if the body is non-empty.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn parts(uri: &'static str) -> RequestParts {
        RequestParts::new(
            Method::GET,
            Uri::from_static(uri),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    #[test]
    fn test_set_uri_reparses_path() {
        let mut request = parts("/a/b");
        request.set_uri(Uri::from_static("/c;x=1"));
        assert_eq!(request.path().matching_path(), "/c");
        assert_eq!(request.path().matrix_param("x"), Some("1"));
    }

    #[test]
    fn test_accept_joins_headers() {
        let mut request = parts("/");
        request
            .headers_mut()
            .append(ACCEPT, HeaderValue::from_static("text/plain"));
        request
            .headers_mut()
            .append(ACCEPT, HeaderValue::from_static("application/json;q=0.5"));
        assert_eq!(
            request.accept().as_deref(),
            Some("text/plain, application/json;q=0.5")
        );
        assert_eq!(parts("/").accept(), None);
    }
}
