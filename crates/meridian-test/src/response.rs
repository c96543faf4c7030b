//! Collected responses and assertions on them.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, StatusCode};
use http_body_util::BodyExt;
use meridian_pipeline::Response;
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A dispatched response with its body read into memory.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Collects a dispatcher response.
    pub async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };
        Self::new(parts.status, parts.headers, body)
    }

    /// Creates a response from parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The first value of a header, if it is visible ASCII.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// The methods listed in `Allow`, sorted.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self
            .header_str(header::ALLOW.as_str())
            .map(|allow| {
                allow
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        methods.sort();
        methods
    }

    /// The raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as text.
    pub fn text(&self) -> Result<String, TestError> {
        Ok(String::from_utf8(self.body.to_vec())?)
    }

    /// The body decoded as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The `error.code` of a generated error envelope.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        let envelope: serde_json::Value = self.json().ok()?;
        envelope["error"]["code"].as_str().map(str::to_string)
    }

    /// Asserts the status.
    ///
    /// # Panics
    ///
    /// Panics on mismatch, printing the body.
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "expected status {expected}, got {} with body {:?}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    #[track_caller]
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        match self.header_str(name) {
            Some(actual) => assert_eq!(actual, expected, "header '{name}'"),
            None => panic!("header '{name}' not found in {:?}", self.headers),
        }
        self
    }

    /// Asserts a header is absent.
    ///
    /// # Panics
    ///
    /// Panics if the header is present.
    #[track_caller]
    pub fn assert_no_header(&self, name: &str) -> &Self {
        assert!(
            !self.headers.contains_key(name),
            "header '{name}' unexpectedly present: {:?}",
            self.headers.get(name)
        );
        self
    }

    /// Asserts the body text.
    ///
    /// # Panics
    ///
    /// Panics if the body differs or is not UTF-8.
    #[track_caller]
    pub fn assert_text(&self, expected: &str) -> &Self {
        assert_eq!(String::from_utf8_lossy(&self.body), expected);
        self
    }

    /// Asserts a field of the JSON body. `path` is dot separated, with
    /// numeric segments indexing arrays.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or the field differs.
    #[track_caller]
    pub fn assert_json_field(&self, path: &str, expected: &serde_json::Value) -> &Self {
        let json: serde_json::Value = match self.json() {
            Ok(json) => json,
            Err(e) => panic!("body is not JSON ({e}): {:?}", String::from_utf8_lossy(&self.body)),
        };
        match json_path(&json, path) {
            Some(actual) => assert_eq!(actual, expected, "JSON field '{path}'"),
            None => panic!("JSON path '{path}' not found in {json}"),
        }
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn json_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(segment),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn response(status: StatusCode, body: &str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ALLOW, HeaderValue::from_static("PUT, GET,HEAD"));
        TestResponse::new(status, headers, Bytes::from(body.to_string()))
    }

    #[test]
    fn test_accessors() {
        let r = response(StatusCode::OK, r#"{"title":"Dune"}"#);
        r.assert_status(StatusCode::OK)
            .assert_header("content-type", "application/json")
            .assert_no_header("location")
            .assert_json_field("title", &json!("Dune"));
        assert_eq!(r.content_type(), Some("application/json"));
        assert_eq!(r.text().unwrap(), r#"{"title":"Dune"}"#);
    }

    #[test]
    fn test_allowed_methods_sorted() {
        let r = response(StatusCode::OK, "");
        assert_eq!(r.allowed_methods(), ["GET", "HEAD", "PUT"]);
    }

    #[test]
    fn test_error_code() {
        let r = response(
            StatusCode::NOT_FOUND,
            r#"{"error":{"code":"NOT_FOUND","message":"x","category":"routing"}}"#,
        );
        assert_eq!(r.error_code().as_deref(), Some("NOT_FOUND"));
        assert_eq!(response(StatusCode::OK, "plain").error_code(), None);
    }

    #[test]
    fn test_json_path() {
        let value = json!({"books": [{"title": "Dune"}, {"title": "Emma"}]});
        assert_eq!(json_path(&value, "books.1.title"), Some(&json!("Emma")));
        assert_eq!(json_path(&value, "books.9"), None);
        assert_eq!(json_path(&value, ""), Some(&value));
    }

    #[test]
    #[should_panic(expected = "expected status 404 Not Found")]
    fn test_assert_status_panics() {
        response(StatusCode::OK, "{}").assert_status(StatusCode::NOT_FOUND);
    }
}
