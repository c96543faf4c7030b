//! Request and response types at the dispatcher boundary.

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use meridian_core::DispatchError;

/// The request type the dispatcher accepts.
pub type Request = http::Request<Full<Bytes>>;

/// The response type the dispatcher produces.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building generated responses.
pub trait ResponseExt {
    /// A response with no body.
    fn empty(status: StatusCode) -> Response;

    /// A JSON error envelope for a dispatch error, with `Allow` for 405.
    fn dispatch_error(error: &DispatchError, request_id: Option<&str>) -> Response;
}

impl ResponseExt for Response {
    fn empty(status: StatusCode) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }

    fn dispatch_error(error: &DispatchError, request_id: Option<&str>) -> Response {
        let body = serde_json::to_vec(&error.to_envelope(request_id)).unwrap_or_default();
        let mut response = http::Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = error.status_code();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(allow) = error.allow_header() {
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
        }
        response
    }
}
