//! In-memory client over a [`Dispatcher`].

use std::sync::Arc;

use http::Method;
use meridian_pipeline::{ConnectionState, Dispatcher};
use serde::Serialize;

use crate::error::TestError;
use crate::request::TestRequest;
use crate::response::TestResponse;

/// Sends requests straight into a dispatcher, with no server or socket.
///
/// ```ignore
/// let client = TestClient::new(dispatcher);
/// client
///     .get("/books/7")
///     .accept("application/json")
///     .send()
///     .await
///     .assert_status(StatusCode::OK);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Wraps a dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::from_shared(Arc::new(dispatcher))
    }

    /// Wraps a dispatcher that is also used elsewhere.
    pub fn from_shared(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Starts a `GET`.
    pub fn get(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a `POST`.
    pub fn post(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a `PUT`.
    pub fn put(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a `DELETE`.
    pub fn delete(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a `HEAD`.
    pub fn head(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Starts an `OPTIONS`.
    pub fn options(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl Into<String>) -> TestClientRequest<'_> {
        let request = self
            .default_headers
            .iter()
            .fold(TestRequest::new(method, uri), |request, (name, value)| {
                request.header(name, value)
            });
        TestClientRequest {
            client: self,
            request,
            connection: None,
        }
    }

    /// Dispatches a built request.
    pub async fn send(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let response = self.dispatcher.dispatch(request.build()?).await;
        Ok(TestResponse::from_response(response).await)
    }
}

/// A request bound to a [`TestClient`].
#[derive(Debug)]
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    request: TestRequest,
    connection: Option<ConnectionState>,
}

impl TestClientRequest<'_> {
    /// Appends a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    /// Sets `Accept`.
    pub fn accept(mut self, accept: impl AsRef<str>) -> Self {
        self.request = self.request.accept(accept);
        self
    }

    /// Sets `Content-Type`.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.request = self.request.content_type(content_type);
        self
    }

    /// Adds a cookie.
    pub fn cookie(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.request = self.request.cookie(name, value);
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.request = self.request.body(body);
        self
    }

    /// Sets a `text/plain` body.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.request = self.request.text(text);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.request = self.request.json(value);
        self
    }

    /// Sets a form body.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.request = self.request.form(value);
        self
    }

    /// Dispatches over `connection`, so a test can close it mid-request.
    pub fn over(mut self, connection: ConnectionState) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Dispatches and returns the collected response.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building the request.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.request.build()?;
        let dispatcher = &self.client.dispatcher;
        let response = match &self.connection {
            Some(connection) => dispatcher.dispatch_with(request, connection).await,
            None => dispatcher.dispatch(request).await,
        };
        Ok(TestResponse::from_response(response).await)
    }

    /// Dispatches and returns the collected response.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request could not be built: {e}"),
        }
    }
}
