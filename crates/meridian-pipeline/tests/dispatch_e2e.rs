//! End-to-end dispatch tests.
//!
//! These drive whole requests through [`Dispatcher`] and check that the
//! stages run in order:
//!
//! 1. Pre-match filters
//! 2. Matching and negotiation
//! 3. Binding
//! 4. Request filters
//! 5. Invocation and exception mapping
//! 6. Response filters
//! 7. Writing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request as HttpRequest, StatusCode};
use http_body_util::{BodyExt, Full};
use meridian_core::{
    Arguments, Entity, Fault, HandlerResult, Operation, ParamType, ParameterSpec,
    RequestContext, RequestParts, ResourceClass, ResourceResponse, RouteRegistry, RouteTable,
    SuspensionRegistry, TypeDescriptor, WebApplicationFault,
};
use meridian_pipeline::{
    Dispatcher, FilterAction, FnPreMatchFilter, FnRequestFilter, FnResponseFilter, Request,
    Response, Suspender,
};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
#[error("order {0} is on hold")]
struct OnHoldFault(String);
impl Fault for OnHoldFault {}

#[derive(Debug, thiserror::Error)]
#[error("ledger corrupted at row {0}")]
struct LedgerFault(u32);
impl Fault for LedgerFault {}

#[derive(Debug, Deserialize)]
struct NewOrder {
    sku: String,
}

#[derive(Default)]
struct Orders {
    invoked: AtomicUsize,
}

async fn get_order(
    orders: Arc<Orders>,
    args: Arguments,
    ctx: Arc<RequestContext>,
) -> HandlerResult {
    orders.invoked.fetch_add(1, Ordering::SeqCst);
    let id: String = args.value("id")?;
    if ctx.flag("hold") {
        return Err(OnHoldFault(id).into());
    }
    if id == "corrupt" {
        return Err(LedgerFault(17).into());
    }
    Ok(ResourceResponse::ok(Entity::text(format!("order {id}"))))
}

async fn create_order(
    orders: Arc<Orders>,
    args: Arguments,
    _: Arc<RequestContext>,
) -> HandlerResult {
    orders.invoked.fetch_add(1, Ordering::SeqCst);
    let order: NewOrder = args.body()?;
    Ok(ResourceResponse::created(&format!("/orders/{}", order.sku)))
}

async fn await_order(_: Arc<Orders>, args: Arguments, ctx: Arc<RequestContext>) -> HandlerResult {
    let id: String = args.value("id")?;
    let suspender = ctx
        .extension::<Suspender>()
        .cloned()
        .ok_or_else(WebApplicationFault::not_found)?;
    Ok(suspender.suspend(&id).await?)
}

async fn ship_order(_: Arc<Orders>, args: Arguments, ctx: Arc<RequestContext>) -> HandlerResult {
    let id: String = args.value("id")?;
    if let Some(suspender) = ctx.extension::<Suspender>() {
        suspender.resume(
            "/orders/{id}/await",
            &id,
            ResourceResponse::ok(Entity::text(format!("order {id} shipped"))),
        )?;
    }
    Ok(ResourceResponse::no_content())
}

fn table(orders: &Arc<Orders>) -> Arc<RouteTable> {
    let mut registry = RouteRegistry::new();
    registry
        .register(
            ResourceClass::new("/orders")
                .singleton(Arc::clone(orders))
                .operation(
                    Operation::get("/{id}")
                        .produces("text/plain")
                        .param(ParameterSpec::path("id", ParamType::String))
                        .handle(get_order),
                )
                .operation(
                    Operation::post("/")
                        .consumes("application/json")
                        .param(ParameterSpec::body(TypeDescriptor::single("NewOrder")))
                        .handle(create_order),
                )
                .operation(
                    Operation::get("/{id}/await")
                        .produces("text/plain")
                        .param(ParameterSpec::path("id", ParamType::String))
                        .handle(await_order),
                )
                .operation(
                    Operation::post("/{id}/ship")
                        .param(ParameterSpec::path("id", ParamType::String))
                        .handle(ship_order),
                ),
        )
        .unwrap();
    registry.freeze().unwrap()
}

fn request(method: Method, uri: &str) -> Request {
    HttpRequest::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn json_request(uri: &str, content_type: &str, body: &'static str) -> Request {
    HttpRequest::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_filters_run_by_priority_then_registration() {
    let orders = Arc::new(Orders::default());
    let trail = Arc::new(Mutex::new(Vec::new()));

    let record = |name: &'static str, trail: &Arc<Mutex<Vec<&'static str>>>| {
        let trail = Arc::clone(trail);
        move |_: &mut RequestContext, _: &RequestParts| {
            trail.lock().unwrap().push(name);
            FilterAction::Continue
        }
    };
    let dispatcher = Dispatcher::builder(table(&orders))
        .request_filter(FnRequestFilter::new("b", record("b", &trail)))
        .request_filter(FnRequestFilter::new("a", record("a", &trail)).with_priority(1))
        .request_filter(FnRequestFilter::new("c", record("c", &trail)))
        .build();

    let response = dispatcher.dispatch(request(Method::GET, "/orders/5")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*trail.lock().unwrap(), ["a", "b", "c"]);
}

#[tokio::test]
async fn test_flagged_fault_is_mapped_and_post_filtered() {
    let orders = Arc::new(Orders::default());
    let dispatcher = Dispatcher::builder(table(&orders))
        .request_filter(FnRequestFilter::new(
            "hold",
            |ctx: &mut RequestContext, request: &RequestParts| {
                if request.header_str("x-hold").is_some() {
                    ctx.set_property("hold", true);
                }
                FilterAction::Continue
            },
        ))
        .response_filter(FnResponseFilter::new(
            "served-by",
            |_: &RequestContext, response: &mut ResourceResponse| {
                response
                    .headers_mut()
                    .insert("x-served-by", http::HeaderValue::from_static("orders"));
            },
        ))
        .exception_mapper::<OnHoldFault, _>(|fault, _| {
            ResourceResponse::status(StatusCode::CONFLICT)
                .with_entity(Entity::text(fault.to_string()))
        })
        .build();

    let held = HttpRequest::builder()
        .uri("/orders/8")
        .header("x-hold", "1")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = dispatcher.dispatch(held).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response.headers().get("x-served-by").unwrap(), "orders");
    assert_eq!(body_text(response).await, "order 8 is on hold");
}

#[tokio::test]
async fn test_unmapped_fault_is_generic_500() {
    let orders = Arc::new(Orders::default());
    let dispatcher = Dispatcher::builder(table(&orders))
        .response_filter(FnResponseFilter::new(
            "served-by",
            |_: &RequestContext, response: &mut ResourceResponse| {
                response
                    .headers_mut()
                    .insert("x-served-by", http::HeaderValue::from_static("orders"));
            },
        ))
        .build();

    let response = dispatcher.dispatch(request(Method::GET, "/orders/corrupt")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.headers().contains_key("x-served-by"));
    let body = body_text(response).await;
    assert!(!body.contains("ledger"));
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_pre_match_method_override() {
    let orders = Arc::new(Orders::default());
    let dispatcher = Dispatcher::builder(table(&orders))
        .pre_match_filter(FnPreMatchFilter::new("override", |request: &mut RequestParts| {
            let target = request
                .header_str("x-http-method-override")
                .and_then(|m| Method::from_bytes(m.as_bytes()).ok());
            if let Some(method) = target {
                request.set_method(method);
            }
            FilterAction::Continue
        }))
        .build();

    let tunneled = HttpRequest::builder()
        .method(Method::POST)
        .uri("/orders/3")
        .header("x-http-method-override", "GET")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = dispatcher.dispatch(tunneled).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "order 3");
}

#[tokio::test]
async fn test_media_type_failures_never_invoke() {
    let orders = Arc::new(Orders::default());
    let dispatcher = Dispatcher::builder(table(&orders)).build();

    let response = dispatcher
        .dispatch(json_request("/orders", "text/csv", "sku\nabc"))
        .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let picky = HttpRequest::builder()
        .uri("/orders/1")
        .header("accept", "image/png")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = dispatcher.dispatch(picky).await;
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    assert_eq!(orders.invoked.load(Ordering::SeqCst), 0);

    let response = dispatcher
        .dispatch(json_request("/orders", "application/json", r#"{"sku":"abc"}"#))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers().get("location").unwrap(), "/orders/abc");
    assert_eq!(orders.invoked.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_suspended_request_is_resumed() {
    let orders = Arc::new(Orders::default());
    let suspensions = Arc::new(SuspensionRegistry::new());
    let dispatcher = Arc::new(
        Dispatcher::builder(table(&orders))
            .suspension(Arc::clone(&suspensions), Duration::from_secs(5))
            .build(),
    );

    let waiter = {
        let dispatcher = Arc::clone(&dispatcher);
        let awaiting = request(Method::GET, "/orders/9/await");
        tokio::spawn(async move { dispatcher.dispatch(awaiting).await })
    };
    while !suspensions.is_suspended("/orders/{id}/await", "9") {
        tokio::task::yield_now().await;
    }

    let shipped = dispatcher.dispatch(request(Method::POST, "/orders/9/ship")).await;
    assert_eq!(shipped.status(), StatusCode::NO_CONTENT);

    let response = waiter.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "order 9 shipped");
    assert!(suspensions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_suspended_request_times_out() {
    let orders = Arc::new(Orders::default());
    let dispatcher = Dispatcher::builder(table(&orders))
        .suspension(
            Arc::new(SuspensionRegistry::new()),
            Duration::from_millis(50),
        )
        .build();

    let response = dispatcher.dispatch(request(Method::GET, "/orders/4/await")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
