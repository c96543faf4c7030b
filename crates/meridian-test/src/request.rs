//! Test request building.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::Full;
use meridian_pipeline::Request;
use serde::Serialize;

use crate::error::TestError;

/// Builder for a request handed to a [`Dispatcher`](meridian_pipeline::Dispatcher).
///
/// Headers are appended, so repeated calls with the same name produce a
/// multi-valued header. Errors are kept until [`build`](Self::build).
///
/// ```
/// use meridian_test::TestRequest;
///
/// let request = TestRequest::get("/books/7")
///     .accept("application/json")
///     .cookie("session", "abc")
///     .build()
///     .unwrap();
/// assert_eq!(request.uri().path(), "/books/7");
/// assert_eq!(request.headers()["cookie"], "session=abc");
/// ```
#[derive(Debug)]
#[must_use]
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: HeaderMap,
    cookies: Vec<String>,
    body: Bytes,
    error: Option<TestError>,
}

impl TestRequest {
    /// Creates a request with any method.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    /// A `GET` request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// A `POST` request.
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// A `PUT` request.
    pub fn put(uri: impl Into<String>) -> Self {
        Self::new(Method::PUT, uri)
    }

    /// A `DELETE` request.
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// A `HEAD` request.
    pub fn head(uri: impl Into<String>) -> Self {
        Self::new(Method::HEAD, uri)
    }

    /// An `OPTIONS` request.
    pub fn options(uri: impl Into<String>) -> Self {
        Self::new(Method::OPTIONS, uri)
    }

    /// Appends a header value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => self.fail(TestError::InvalidHeader(name.to_string())),
        }
        self
    }

    /// Sets the `Accept` header.
    pub fn accept(self, accept: impl AsRef<str>) -> Self {
        self.header(header::ACCEPT.as_str(), accept)
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.headers.remove(header::CONTENT_TYPE);
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Adds a cookie. All cookies are sent in one `Cookie` header.
    pub fn cookie(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.cookies
            .push(format!("{}={}", name.as_ref(), value.as_ref()));
        self
    }

    /// Sets a raw body without touching `Content-Type`.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a `text/plain` body.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(text.into()).content_type("text/plain")
    }

    /// Sets an `application/json` body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body(bytes).content_type("application/json"),
            Err(e) => {
                self.fail(TestError::Encode(e.to_string()));
                self
            }
        }
    }

    /// Sets an `application/x-www-form-urlencoded` body.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => self
                .body(encoded)
                .content_type("application/x-www-form-urlencoded"),
            Err(e) => {
                self.fail(TestError::Encode(e.to_string()));
                self
            }
        }
    }

    /// The method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building, or
    /// [`TestError::InvalidUri`].
    pub fn build(self) -> Result<Request, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::invalid_uri(&self.uri, e))?;

        let mut request = http::Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        if !self.cookies.is_empty() {
            let cookies = self.cookies.join("; ");
            let value = HeaderValue::try_from(cookies.as_str())
                .map_err(|_| TestError::InvalidHeader(header::COOKIE.to_string()))?;
            request.headers_mut().insert(header::COOKIE, value);
        }
        Ok(request)
    }

    fn fail(&mut self, error: TestError) {
        self.error.get_or_insert(error);
    }
}
