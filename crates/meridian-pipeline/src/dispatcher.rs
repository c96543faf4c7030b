//! The request dispatcher.
//!
//! One call to [`Dispatcher::dispatch`] takes a request through the whole
//! pipeline:
//!
//! ```text
//! pre-match filters → match → bind → request filters → invoke
//!        → map faults → response filters → write
//! ```
//!
//! Every failure becomes a response; nothing escapes the dispatcher.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::{HeaderName, HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use meridian_codec::CodecRegistry;
use meridian_core::{
    AppFault, Arguments, Container, DispatchError, Fault, Invoker, MatchCandidate,
    MatchedResource, RequestContext, RequestId, RequestParts, ResourceResponse, RouteTable,
    SuspensionRegistry,
};
use meridian_extract::Binder;
use meridian_router::MediaType;
use meridian_telemetry::{describe_metrics, record_request, InFlightGuard};
use tracing::Instrument;

use crate::connection::ConnectionState;
use crate::filter::{FilterAction, FilterChain, PreMatchFilter, RequestFilter, ResponseFilter};
use crate::mapper::ExceptionMapperRegistry;
use crate::state::{DispatchState, StateTracker};
use crate::suspension::Suspender;
use crate::types::{Request, Response, ResponseExt};

/// Header carrying the request ID unless configured otherwise.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Why invocation did not produce a response.
enum Failure {
    Fault(AppFault),
    Dispatch(DispatchError),
}

/// Dispatches requests against a frozen [`RouteTable`].
///
/// # Example
///
/// ```
/// use meridian_core::{Entity, Operation, ResourceClass, ResourceResponse, RouteRegistry};
/// use meridian_pipeline::Dispatcher;
/// use bytes::Bytes;
/// use http_body_util::Full;
/// use std::sync::Arc;
///
/// struct Hello;
///
/// let mut registry = RouteRegistry::new();
/// registry
///     .register(ResourceClass::new("/hello").singleton(Arc::new(Hello)).operation(
///         Operation::get("/").produces("text/plain").handle(|_: Arc<Hello>, _, _| async {
///             Ok(ResourceResponse::ok(Entity::text("hi")))
///         }),
///     ))
///     .unwrap();
/// let dispatcher = Dispatcher::builder(registry.freeze().unwrap()).build();
///
/// # tokio_test::block_on(async {
/// let request = http::Request::builder().uri("/hello").body(Full::new(Bytes::new())).unwrap();
/// let response = dispatcher.dispatch(request).await;
/// assert_eq!(response.status(), 200);
/// # });
/// ```
pub struct Dispatcher {
    table: Arc<RouteTable>,
    codecs: Arc<CodecRegistry>,
    binder: Binder,
    container: Arc<Container>,
    pre_match: FilterChain<dyn PreMatchFilter>,
    request_filters: FilterChain<dyn RequestFilter>,
    response_filters: FilterChain<dyn ResponseFilter>,
    mappers: ExceptionMapperRegistry,
    suspension: Option<(Arc<SuspensionRegistry>, Duration)>,
    request_id_header: HeaderName,
    propagate_request_id: bool,
}

impl Dispatcher {
    /// Starts building a dispatcher for `table`.
    #[must_use]
    pub fn builder(table: Arc<RouteTable>) -> DispatcherBuilder {
        DispatcherBuilder::new(table)
    }

    /// The route table.
    #[must_use]
    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    /// The codec registry.
    #[must_use]
    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Dispatches a request on a connection that stays open.
    pub async fn dispatch(&self, request: Request) -> Response {
        self.dispatch_with(request, &ConnectionState::new()).await
    }

    /// Dispatches a request, watching `connection` for closure.
    ///
    /// If the connection closes after invocation, response filters stop,
    /// nothing is written and the returned response is an empty `503` meant
    /// to be discarded.
    pub async fn dispatch_with(&self, request: Request, connection: &ConnectionState) -> Response {
        let started = Instant::now();
        let _in_flight = InFlightGuard::new();

        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let request_id = parts
            .headers
            .get(&self.request_id_header)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();
        let request = RequestParts::new(parts.method, parts.uri, parts.headers, body);
        let method = request.method().clone();

        let span = tracing::info_span!(
            "dispatch",
            request_id = %request_id,
            method = %method,
            path = request.path().raw(),
            route = tracing::field::Empty,
            status = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );
        let ctx = RequestContext::with_request_id(request_id);
        let (mut response, outcome) = self
            .process(ctx, request, connection)
            .instrument(span.clone())
            .await;

        if self.propagate_request_id {
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response
                    .headers_mut()
                    .insert(self.request_id_header.clone(), value);
            }
        }

        let status = response.status().as_u16();
        span.record("status", status);
        span.record("outcome", outcome.as_str());
        span.in_scope(|| tracing::info!(status, outcome = outcome.as_str(), "request dispatched"));
        record_request(method.as_str(), status, outcome.as_str(), started.elapsed());
        response
    }

    async fn process(
        &self,
        mut ctx: RequestContext,
        mut request: RequestParts,
        connection: &ConnectionState,
    ) -> (Response, DispatchState) {
        let mut state = StateTracker::new();
        let request_id = ctx.request_id().to_string();

        for filter in self.pre_match.iter() {
            if let FilterAction::Abort(response) = filter.filter(&mut request).await {
                tracing::debug!(filter = filter.name(), "pre-match filter aborted");
                return self.abort_with(&mut state, response, None, &request, &request_id);
            }
        }

        let candidate = match self.table.match_request(&request) {
            Ok(candidate) => candidate,
            Err(error) => {
                if request.method() == Method::OPTIONS {
                    if let Some(allow) = error.allow_header() {
                        state.advance(DispatchState::Written);
                        return (options_response(&allow), state.current());
                    }
                }
                return fail(&mut state, &error, &request_id);
            }
        };
        state.advance(DispatchState::Matched);

        let template = candidate.template();
        tracing::Span::current().record("route", template.as_str());
        ctx.set_matched(MatchedResource {
            class: candidate.method().class_name().to_string(),
            method: candidate.method().name().to_string(),
            template: template.clone(),
        });
        if let Some((registry, timeout)) = &self.suspension {
            ctx.set_extension(Suspender::new(Arc::clone(registry), *timeout, template));
        }

        let arguments = match self.binder.bind_chain(&candidate, &request) {
            Ok(arguments) => arguments,
            Err(error) => return fail(&mut state, &DispatchError::from(error), &request_id),
        };
        state.advance(DispatchState::Bound);

        for filter in self.request_filters.iter() {
            if let FilterAction::Abort(response) = filter.filter(&mut ctx, &request).await {
                tracing::debug!(filter = filter.name(), "request filter aborted");
                let candidate = Some(&candidate);
                return self.abort_with(&mut state, response, candidate, &request, &request_id);
            }
        }
        state.advance(DispatchState::PreFiltered);

        let ctx = Arc::new(ctx);
        let mut response = match self.invoke(&candidate, arguments, &ctx).await {
            Ok(response) => response,
            Err(Failure::Fault(fault)) => {
                if let Some(response) = self.mappers.map(&fault, &ctx).into_response() {
                    response
                } else {
                    tracing::error!(
                        fault = fault.fault_type().name(),
                        error = %fault,
                        "unmapped fault"
                    );
                    let error =
                        DispatchError::unmapped_fault(fault.fault_type().name(), fault.to_string());
                    return fail(&mut state, &error, &request_id);
                }
            }
            Err(Failure::Dispatch(error)) => return fail(&mut state, &error, &request_id),
        };
        state.advance(DispatchState::Invoked);

        for filter in self.response_filters.iter() {
            if connection.is_closed() {
                return closed(&mut state);
            }
            filter.filter(&ctx, &mut response).await;
        }
        state.advance(DispatchState::PostFiltered);

        if connection.is_closed() {
            return closed(&mut state);
        }
        match self.write(response, Some(&candidate), &request) {
            Ok(written) => {
                state.advance(DispatchState::Written);
                (written, state.current())
            }
            Err(error) => fail(&mut state, &error, &request_id),
        }
    }

    /// Obtains the root instance, runs the locators, then the method.
    async fn invoke(
        &self,
        candidate: &MatchCandidate,
        arguments: Vec<Arguments>,
        ctx: &Arc<RequestContext>,
    ) -> Result<ResourceResponse, Failure> {
        let lifecycle = self
            .table
            .lifecycle(candidate.root_class())
            .ok_or_else(|| {
                Failure::Dispatch(DispatchError::internal("resource class has no lifecycle"))
            })?;
        let mut instance = lifecycle.instance(&self.container).map_err(|e| {
            Failure::Dispatch(DispatchError::internal_with_source(
                "resource instance could not be created",
                e,
            ))
        })?;

        let mut arguments = arguments.into_iter();
        for method in &candidate.chain {
            let args = arguments.next().unwrap_or_default();
            match method.invoker() {
                Invoker::Locator(locator) => {
                    instance = locator
                        .call(instance, args, Arc::clone(ctx))
                        .await
                        .map_err(Failure::Fault)?;
                }
                Invoker::Method(handler) => {
                    return handler
                        .call(instance, args, Arc::clone(ctx))
                        .await
                        .map_err(Failure::Fault);
                }
            }
        }
        Err(Failure::Dispatch(DispatchError::internal(
            "matched chain ends in a locator",
        )))
    }

    /// Answers with a filter's abort response.
    fn abort_with(
        &self,
        state: &mut StateTracker,
        response: ResourceResponse,
        candidate: Option<&MatchCandidate>,
        request: &RequestParts,
        request_id: &str,
    ) -> (Response, DispatchState) {
        state.advance(DispatchState::Aborted);
        let response = self
            .write(response, candidate, request)
            .unwrap_or_else(|error| Response::dispatch_error(&error, Some(request_id)));
        (response, state.current())
    }

    /// Serialises a resource response with the negotiated writer.
    fn write(
        &self,
        mut response: ResourceResponse,
        candidate: Option<&MatchCandidate>,
        request: &RequestParts,
    ) -> Result<Response, DispatchError> {
        let media_type = response.media_type().cloned();
        let entity = response.take_entity();
        let mut out = Response::empty(response.status_code());
        *out.headers_mut() = std::mem::take(response.headers_mut());

        let Some(entity) = entity.filter(|e| !e.is_empty()) else {
            return Ok(out);
        };
        let target = media_type
            .or_else(|| candidate.map(|c| c.response_type.clone()))
            .unwrap_or_else(MediaType::wildcard);
        let writer = self.codecs.select_writer(&target, &entity)?;
        let bytes = writer.codec.write(&entity, &writer.media_type)?;

        if !out.headers().contains_key(CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::from_str(&writer.media_type.to_string()) {
                out.headers_mut().insert(CONTENT_TYPE, value);
            }
        }
        out.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        if request.method() != Method::HEAD {
            *out.body_mut() = Full::new(bytes);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.table.len())
            .field("pre_match_filters", &self.pre_match.len())
            .field("request_filters", &self.request_filters.len())
            .field("response_filters", &self.response_filters.len())
            .field("mappers", &self.mappers)
            .finish_non_exhaustive()
    }
}

fn fail(
    state: &mut StateTracker,
    error: &DispatchError,
    request_id: &str,
) -> (Response, DispatchState) {
    if error.status_code().is_server_error() {
        tracing::error!(error = %error, category = ?error.category(), "dispatch failed");
    } else {
        tracing::debug!(error = %error, category = ?error.category(), "request rejected");
    }
    state.advance(DispatchState::Aborted);
    let response = Response::dispatch_error(error, Some(request_id));
    (response, state.current())
}

fn closed(state: &mut StateTracker) -> (Response, DispatchState) {
    tracing::debug!("connection closed, response dropped");
    state.advance(DispatchState::Aborted);
    let response = Response::empty(StatusCode::SERVICE_UNAVAILABLE);
    (response, state.current())
}

fn options_response(allow: &str) -> Response {
    let mut response = Response::empty(StatusCode::OK);
    if let Ok(value) = HeaderValue::from_str(allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    table: Arc<RouteTable>,
    codecs: CodecRegistry,
    container: Container,
    pre_match: FilterChain<dyn PreMatchFilter>,
    request_filters: FilterChain<dyn RequestFilter>,
    response_filters: FilterChain<dyn ResponseFilter>,
    mappers: ExceptionMapperRegistry,
    suspension: Option<(Arc<SuspensionRegistry>, Duration)>,
    request_id_header: HeaderName,
    propagate_request_id: bool,
}

impl DispatcherBuilder {
    /// Starts with the default codecs, an empty container and no filters.
    #[must_use]
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self {
            table,
            codecs: CodecRegistry::with_defaults(false),
            container: Container::new(),
            pre_match: FilterChain::default(),
            request_filters: FilterChain::default(),
            response_filters: FilterChain::default(),
            mappers: ExceptionMapperRegistry::new(),
            suspension: None,
            request_id_header: HeaderName::from_static(REQUEST_ID_HEADER),
            propagate_request_id: true,
        }
    }

    /// Replaces the codec registry.
    #[must_use]
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Sets the container resource instances are resolved from.
    #[must_use]
    pub fn container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    /// Adds a pre-match filter.
    #[must_use]
    pub fn pre_match_filter(mut self, filter: impl PreMatchFilter) -> Self {
        self.pre_match.add(filter.priority(), Arc::new(filter));
        self
    }

    /// Adds a request filter.
    #[must_use]
    pub fn request_filter(mut self, filter: impl RequestFilter) -> Self {
        self.request_filters.add(filter.priority(), Arc::new(filter));
        self
    }

    /// Adds a response filter.
    #[must_use]
    pub fn response_filter(mut self, filter: impl ResponseFilter) -> Self {
        self.response_filters.add(filter.priority(), Arc::new(filter));
        self
    }

    /// Replaces the exception mappers.
    #[must_use]
    pub fn mappers(mut self, mappers: ExceptionMapperRegistry) -> Self {
        self.mappers = mappers;
        self
    }

    /// Registers an exception mapper for faults of type `F`.
    #[must_use]
    pub fn exception_mapper<F, M>(mut self, mapper: M) -> Self
    where
        F: Fault,
        M: Fn(&AppFault, &RequestContext) -> ResourceResponse + Send + Sync + 'static,
    {
        self.mappers.register::<F, M>(mapper);
        self
    }

    /// Makes a [`Suspender`] available to resource methods.
    #[must_use]
    pub fn suspension(mut self, registry: Arc<SuspensionRegistry>, timeout: Duration) -> Self {
        self.suspension = Some((registry, timeout));
        self
    }

    /// Sets the header the request ID is read from and echoed on.
    #[must_use]
    pub fn request_id_header(mut self, name: HeaderName) -> Self {
        self.request_id_header = name;
        self
    }

    /// Whether responses carry the request ID header.
    #[must_use]
    pub fn propagate_request_id(mut self, propagate: bool) -> Self {
        self.propagate_request_id = propagate;
        self
    }

    /// Builds the dispatcher.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        describe_metrics();
        let codecs = Arc::new(self.codecs);
        Dispatcher {
            binder: Binder::new(Arc::clone(&self.table), Arc::clone(&codecs)),
            table: self.table,
            codecs,
            container: Arc::new(self.container),
            pre_match: self.pre_match,
            request_filters: self.request_filters,
            response_filters: self.response_filters,
            mappers: self.mappers,
            suspension: self.suspension,
            request_id_header: self.request_id_header,
            propagate_request_id: self.propagate_request_id,
        }
    }
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("routes", &self.table.len())
            .field("codecs", &self.codecs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FnPreMatchFilter, FnRequestFilter, FnResponseFilter};
    use bytes::Bytes;
    use meridian_core::{
        Entity, HandlerResult, Operation, ParamType, ParameterSpec, ResourceClass, RouteRegistry,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Catalog {
        calls: AtomicUsize,
    }

    async fn item(catalog: Arc<Catalog>, args: Arguments, _: Arc<RequestContext>) -> HandlerResult {
        catalog.calls.fetch_add(1, Ordering::SeqCst);
        let id: i64 = args.value("id")?;
        Ok(ResourceResponse::ok(Entity::text(format!("item {id}"))))
    }

    fn table(catalog: &Arc<Catalog>) -> Arc<RouteTable> {
        let mut registry = RouteRegistry::new();
        registry
            .register(
                ResourceClass::new("/catalog")
                    .singleton(Arc::clone(catalog))
                    .operation(
                        Operation::get("/items/{id}")
                            .produces("text/plain")
                            .param(ParameterSpec::path("id", ParamType::I64))
                            .handle(item),
                    ),
            )
            .unwrap();
        registry.freeze().unwrap()
    }

    fn get(uri: &str) -> Request {
        http::Request::builder()
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_writes_text() {
        let catalog = Arc::new(Catalog::default());
        let dispatcher = Dispatcher::builder(table(&catalog)).build();
        let response = dispatcher.dispatch(get("/catalog/items/7")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap(),
            "text/plain"
        );
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(body(response).await, "item 7");
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_echoed() {
        let catalog = Arc::new(Catalog::default());
        let dispatcher = Dispatcher::builder(table(&catalog)).build();
        let id = RequestId::new().to_string();
        let request = http::Request::builder()
            .uri("/catalog/items/1")
            .header(REQUEST_ID_HEADER, &id)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = dispatcher.dispatch(request).await;
        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), id.as_str());

        let quiet = Dispatcher::builder(table(&catalog))
            .propagate_request_id(false)
            .build();
        let response = quiet.dispatch(get("/catalog/items/1")).await;
        assert!(!response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_bad_path_value_is_400_without_invocation() {
        let catalog = Arc::new(Catalog::default());
        let dispatcher = Dispatcher::builder(table(&catalog)).build();
        let response = dispatcher.dispatch(get("/catalog/items/seven")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_options_and_head() {
        let catalog = Arc::new(Catalog::default());
        let dispatcher = Dispatcher::builder(table(&catalog)).build();

        let options = http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/catalog/items/1")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = dispatcher.dispatch(options).await;
        assert_eq!(response.status(), StatusCode::OK);
        let allow = response.headers().get(ALLOW).unwrap().to_str().unwrap();
        assert!(allow.contains("GET"));
        assert!(allow.contains("HEAD"));

        let head = http::Request::builder()
            .method(Method::HEAD)
            .uri("/catalog/items/1")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = dispatcher.dispatch(head).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "6");
        assert_eq!(body(response).await, "");
    }

    #[tokio::test]
    async fn test_pre_match_filter_rewrites_path() {
        let catalog = Arc::new(Catalog::default());
        let dispatcher = Dispatcher::builder(table(&catalog))
            .pre_match_filter(FnPreMatchFilter::new("legacy", |request: &mut RequestParts| {
                if request.path().raw() == "/legacy" {
                    request.set_uri(http::Uri::from_static("/catalog/items/99"));
                }
                FilterAction::Continue
            }))
            .build();
        let response = dispatcher.dispatch(get("/legacy")).await;
        assert_eq!(body(response).await, "item 99");
    }

    #[tokio::test]
    async fn test_request_filter_abort_skips_handler() {
        let catalog = Arc::new(Catalog::default());
        let dispatcher = Dispatcher::builder(table(&catalog))
            .request_filter(FnRequestFilter::new(
                "deny",
                |_: &mut RequestContext, _: &RequestParts| {
                    FilterAction::Abort(ResourceResponse::status(StatusCode::FORBIDDEN))
                },
            ))
            .response_filter(FnResponseFilter::new(
                "stamp",
                |_: &RequestContext, response: &mut ResourceResponse| {
                    response.headers_mut().insert("x-stamped", HeaderValue::from_static("1"));
                },
            ))
            .build();
        let response = dispatcher.dispatch(get("/catalog/items/1")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!response.headers().contains_key("x-stamped"));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_closed_connection_skips_write() {
        let catalog = Arc::new(Catalog::default());
        let connection = ConnectionState::new();
        let closer = connection.clone();
        let dispatcher = Dispatcher::builder(table(&catalog))
            .response_filter(FnResponseFilter::new(
                "closer",
                move |_: &RequestContext, _: &mut ResourceResponse| closer.close(),
            ))
            .response_filter(FnResponseFilter::new(
                "never",
                |_: &RequestContext, response: &mut ResourceResponse| {
                    response.headers_mut().insert("x-never", HeaderValue::from_static("1"));
                },
            ))
            .build();
        let response = dispatcher
            .dispatch_with(get("/catalog/items/1"), &connection)
            .await;
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!response.headers().contains_key("x-never"));
        assert_eq!(body(response).await, "");
    }
}
