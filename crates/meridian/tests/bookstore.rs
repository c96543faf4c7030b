//! Bookstore scenarios run through the whole stack with [`TestClient`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use http::StatusCode;
use meridian::prelude::*;
use meridian_test::TestClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Book {
    id: i64,
    title: String,
}

#[derive(Debug, PartialEq, Deserialize)]
struct BookQuery {
    title: Option<String>,
    limit: i32,
}

#[derive(Debug, thiserror::Error)]
#[error("book {0} not found")]
struct BookNotFoundFault(i64);
impl Fault for BookNotFoundFault {}

#[derive(Debug, thiserror::Error)]
#[error("inventory lock poisoned")]
struct IllegalStateFault;
impl Fault for IllegalStateFault {}

struct Bookstore {
    books: Mutex<BTreeMap<i64, Book>>,
    audited: AtomicUsize,
}

impl Bookstore {
    fn stocked() -> Arc<Self> {
        let books = [(1, "Dune"), (2, "Emma")]
            .into_iter()
            .map(|(id, title)| {
                (
                    id,
                    Book {
                        id,
                        title: title.to_string(),
                    },
                )
            })
            .collect();
        Arc::new(Self {
            books: Mutex::new(books),
            audited: AtomicUsize::new(0),
        })
    }
}

struct Chapters {
    book: i64,
}

struct Volume {
    book: i64,
    edition: Option<String>,
}

async fn get_book(store: Arc<Bookstore>, args: Arguments, _: Arc<RequestContext>) -> HandlerResult {
    let id: i64 = args.value("id")?;
    let book = store.books.lock().unwrap().get(&id).cloned();
    let book = book.ok_or(BookNotFoundFault(id))?;
    Ok(ResourceResponse::ok(Entity::json(&book)?))
}

async fn anything(_: Arc<Bookstore>, args: Arguments, _: Arc<RequestContext>) -> HandlerResult {
    let rest: String = args.value("any")?;
    Ok(ResourceResponse::ok(Entity::text(format!("any:{rest}"))))
}

async fn list_books(store: Arc<Bookstore>, _: Arguments, _: Arc<RequestContext>) -> HandlerResult {
    let books: Vec<Book> = store.books.lock().unwrap().values().cloned().collect();
    Ok(ResourceResponse::ok(Entity::collection(&books)?))
}

async fn add_book(store: Arc<Bookstore>, args: Arguments, _: Arc<RequestContext>) -> HandlerResult {
    let book: Book = args.body()?;
    let location = format!("/bookstore/books/{}", book.id);
    store.books.lock().unwrap().insert(book.id, book);
    Ok(ResourceResponse::created(&location))
}

async fn search(store: Arc<Bookstore>, args: Arguments, _: Arc<RequestContext>) -> HandlerResult {
    let query: BookQuery = args.bean("BookQuery")?;
    let limit = usize::try_from(query.limit).unwrap_or(0);
    let titles: Vec<String> = store
        .books
        .lock()
        .unwrap()
        .values()
        .filter(|b| query.title.as_ref().map_or(true, |t| b.title.contains(t.as_str())))
        .take(limit)
        .map(|b| b.title.clone())
        .collect();
    Ok(ResourceResponse::ok(Entity::json(&titles)?))
}

async fn audit(store: Arc<Bookstore>, args: Arguments, ctx: Arc<RequestContext>) -> HandlerResult {
    store.audited.fetch_add(1, Ordering::SeqCst);
    let id: i64 = args.value("id")?;
    if ctx.flag("strict") {
        return Err(BookNotFoundFault(id).into());
    }
    Ok(ResourceResponse::no_content())
}

async fn broken(_: Arc<Bookstore>, _: Arguments, _: Arc<RequestContext>) -> HandlerResult {
    Err(IllegalStateFault.into())
}

async fn chapters(
    _: Arc<Bookstore>,
    args: Arguments,
    _: Arc<RequestContext>,
) -> Result<Arc<Chapters>, AppFault> {
    let book: i64 = args.value("id")?;
    Ok(Arc::new(Chapters { book }))
}

async fn chapter(
    chapters: Arc<Chapters>,
    args: Arguments,
    _: Arc<RequestContext>,
) -> HandlerResult {
    let n: u32 = args.value("n")?;
    Ok(ResourceResponse::ok(Entity::text(format!(
        "book {} chapter {n}",
        chapters.book
    ))))
}

async fn volumes(
    _: Arc<Bookstore>,
    args: Arguments,
    _: Arc<RequestContext>,
) -> Result<Arc<Volume>, AppFault> {
    Ok(Arc::new(Volume {
        book: args.value("id")?,
        edition: args.optional("edition")?,
    }))
}

async fn volume(volume: Arc<Volume>, args: Arguments, _: Arc<RequestContext>) -> HandlerResult {
    let n: u32 = args.value("id")?;
    let edition: Option<String> = args.optional("edition")?;
    Ok(ResourceResponse::ok(Entity::text(format!(
        "book {} volume {n} {}/{}",
        volume.book,
        edition.as_deref().unwrap_or("-"),
        volume.edition.as_deref().unwrap_or("-")
    ))))
}

async fn await_book(_: Arc<Bookstore>, args: Arguments, ctx: Arc<RequestContext>) -> HandlerResult {
    let id: String = args.value("id")?;
    let suspender = ctx
        .extension::<Suspender>()
        .cloned()
        .ok_or_else(WebApplicationFault::not_found)?;
    Ok(suspender.suspend(&id).await?)
}

fn routes(store: &Arc<Bookstore>) -> Arc<RouteTable> {
    let mut registry = RouteRegistry::new();
    registry.register_bean(
        BeanSpec::new("BookQuery")
            .member(ParameterSpec::query("title", ParamType::String))
            .member(ParameterSpec::query("limit", ParamType::I32).default_value("10")),
    );
    registry
        .register(
            ResourceClass::new("/bookstore")
                .singleton(Arc::clone(store))
                .operation(
                    Operation::get("/{id}")
                        .named("book")
                        .produces("application/json")
                        .param(ParameterSpec::path("id", ParamType::I64))
                        .handle(get_book),
                )
                .operation(
                    Operation::get("/{any:.*}")
                        .named("any")
                        .produces("text/plain")
                        .param(ParameterSpec::path("any", ParamType::String))
                        .handle(anything),
                )
                .operation(
                    Operation::get("/books")
                        .produces("application/json")
                        .returns(TypeDescriptor::collection_of::<Book>())
                        .handle(list_books),
                )
                .operation(
                    Operation::post("/books")
                        .consumes("application/json")
                        .param(ParameterSpec::body(TypeDescriptor::of::<Book>()).required())
                        .handle(add_book),
                )
                .operation(
                    Operation::get("/books/search")
                        .produces("application/json")
                        .param(ParameterSpec::bean("BookQuery"))
                        .handle(search),
                )
                .operation(
                    Operation::get("/audit/{id}")
                        .param(ParameterSpec::path("id", ParamType::I64))
                        .handle(audit),
                )
                .operation(Operation::get("/broken").handle(broken))
                .operation(
                    Operation::locator("/books/{id}/chapters", chapters)
                        .param(ParameterSpec::path("id", ParamType::I64)),
                )
                .operation(
                    Operation::locator("/volumes/{id}", volumes)
                        .param(ParameterSpec::path("id", ParamType::I64))
                        .param(ParameterSpec::matrix("edition", ParamType::String)),
                )
                .operation(
                    Operation::get("/books/{id}/await")
                        .produces("text/plain")
                        .param(ParameterSpec::path("id", ParamType::String))
                        .handle(await_book),
                ),
        )
        .unwrap();
    registry
        .register_sub_resource(
            ResourceClass::<Chapters>::new("").operation(
                Operation::get("/{n}")
                    .produces("text/plain")
                    .param(ParameterSpec::path("n", ParamType::U32))
                    .handle(chapter),
            ),
        )
        .unwrap();
    registry
        .register_sub_resource(
            ResourceClass::<Volume>::new("").operation(
                Operation::get("/{id}")
                    .produces("text/plain")
                    .param(ParameterSpec::path("id", ParamType::U32))
                    .param(ParameterSpec::matrix("edition", ParamType::String))
                    .handle(volume),
            ),
        )
        .unwrap();
    registry.freeze().unwrap()
}

fn client_with(config: &MeridianConfig, store: &Arc<Bookstore>) -> TestClient {
    let dispatcher = meridian::configure(routes(store), config)
        .unwrap()
        .request_filter(FnRequestFilter::new(
            "strict",
            |ctx: &mut RequestContext, request: &RequestParts| {
                if request.header_str("x-strict").is_some() {
                    ctx.set_property("strict", true);
                }
                FilterAction::Continue
            },
        ))
        .request_filter(FnRequestFilter::new(
            "deny",
            |_: &mut RequestContext, request: &RequestParts| {
                if request.header_str("x-deny").is_some() {
                    FilterAction::Abort(ResourceResponse::status(StatusCode::FORBIDDEN))
                } else {
                    FilterAction::Continue
                }
            },
        ))
        .response_filter(FnResponseFilter::new(
            "audit-trail",
            |_: &RequestContext, response: &mut ResourceResponse| {
                response
                    .headers_mut()
                    .insert("x-audited", http::HeaderValue::from_static("yes"));
            },
        ))
        .exception_mapper::<BookNotFoundFault, _>(|fault, _| {
            let id = fault.downcast_ref::<BookNotFoundFault>().map_or(0, |f| f.0);
            ResourceResponse::status(StatusCode::NOT_FOUND)
                .with_entity(Entity::text(format!("no book {id}")))
        })
        .build();
    TestClient::new(dispatcher)
}

fn client(store: &Arc<Bookstore>) -> TestClient {
    client_with(&MeridianConfig::default(), store)
}

#[tokio::test]
async fn test_numeric_id_beats_catch_all() {
    let store = Bookstore::stocked();
    let client = client(&store);

    client
        .get("/bookstore/1")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("title", &json!("Dune"));

    client
        .get("/bookstore/shelves/north")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_text("any:shelves/north");
}

#[tokio::test]
async fn test_unconvertible_path_value_is_400() {
    let client = client(&Bookstore::stocked());
    let response = client.get("/bookstore/abc").send().await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code().as_deref(), Some("BAD_REQUEST"));
}

#[tokio::test]
async fn test_mapped_fault() {
    let client = client(&Bookstore::stocked());
    client
        .get("/bookstore/77")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_header("x-audited", "yes")
        .assert_text("no book 77");
}

#[tokio::test]
async fn test_unmapped_fault_is_generic() {
    let client = client(&Bookstore::stocked());
    let response = client.get("/bookstore/broken").send().await;
    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_no_header("x-audited");
    assert_eq!(response.error_code().as_deref(), Some("INTERNAL_ERROR"));
    assert!(!response.text().unwrap().contains("poisoned"));
}

#[tokio::test]
async fn test_request_filter_flag_reaches_handler() {
    let store = Bookstore::stocked();
    let client = client(&store);

    client
        .get("/bookstore/audit/5")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT)
        .assert_header("x-audited", "yes");

    client
        .get("/bookstore/audit/5")
        .header("x-strict", "1")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_header("x-audited", "yes")
        .assert_text("no book 5");

    assert_eq!(store.audited.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_aborting_filter_skips_handler() {
    let store = Bookstore::stocked();
    let client = client(&store);

    client
        .get("/bookstore/audit/5")
        .header("x-deny", "1")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_no_header("x-audited");
    assert_eq!(store.audited.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_then_fetch() {
    let client = client(&Bookstore::stocked());

    client
        .post("/bookstore/books")
        .json(&json!({"id": 3, "title": "Ubik"}))
        .send()
        .await
        .assert_status(StatusCode::CREATED)
        .assert_header("location", "/bookstore/books/3");

    let book: Book = client.get("/bookstore/3").send().await.json().unwrap();
    assert_eq!(
        book,
        Book {
            id: 3,
            title: "Ubik".to_string()
        }
    );
}

#[tokio::test]
async fn test_negotiation_failures() {
    let store = Bookstore::stocked();
    let client = client(&store);

    let response = client
        .post("/bookstore/books")
        .text("id=3")
        .send()
        .await;
    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.error_code().as_deref(), Some("UNSUPPORTED_MEDIA_TYPE"));

    client
        .get("/bookstore/books")
        .accept("image/png")
        .send()
        .await
        .assert_status(StatusCode::NOT_ACCEPTABLE);

    assert_eq!(store.books.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_routing_failures() {
    let client = client(&Bookstore::stocked());

    let response = client.delete("/bookstore/books").send().await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let allowed = response.allowed_methods();
    assert!(allowed.iter().any(|m| m == "GET"));
    assert!(allowed.iter().any(|m| m == "POST"));

    let response = client.get("/library/1").send().await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.error_code().as_deref(), Some("NOT_FOUND"));
}

#[tokio::test]
async fn test_options_and_head() {
    let client = client(&Bookstore::stocked());

    let response = client.options("/bookstore/books").send().await;
    response.assert_status(StatusCode::OK);
    assert!(response.allowed_methods().iter().any(|m| m == "POST"));

    let full = client.get("/bookstore/2").send().await;
    let head = client.head("/bookstore/2").send().await;
    head.assert_status(StatusCode::OK)
        .assert_header("content-length", &full.body().len().to_string());
    assert!(head.body().is_empty());
}

#[tokio::test]
async fn test_bean_query() {
    let client = client(&Bookstore::stocked());

    let titles: Vec<String> = client
        .get("/bookstore/books/search?title=m&limit=5")
        .send()
        .await
        .json()
        .unwrap();
    assert_eq!(titles, ["Emma"]);

    let titles: Vec<String> = client
        .get("/bookstore/books/search")
        .send()
        .await
        .json()
        .unwrap();
    assert_eq!(titles, ["Dune", "Emma"]);

    client
        .get("/bookstore/books/search?limit=many")
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_locator_chain() {
    let client = client(&Bookstore::stocked());
    client
        .get("/bookstore/books/2/chapters/4")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_text("book 2 chapter 4");

    client
        .get("/bookstore/books/x/chapters/4")
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_locator_keeps_its_own_path_values() {
    let client = client(&Bookstore::stocked());
    client
        .get("/bookstore/volumes/7/3")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_text("book 7 volume 3 -/-");

    client
        .get("/bookstore/volumes/x/3")
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_matrix_params_follow_matched_segments() {
    let client = client(&Bookstore::stocked());
    client
        .get("/bookstore/volumes;edition=first/7/3;edition=second")
        .send()
        .await
        .assert_text("book 7 volume 3 second/first");

    client
        .get("/bookstore/volumes/7/3;edition=second")
        .send()
        .await
        .assert_text("book 7 volume 3 second/-");

    client
        .get("/bookstore/volumes;edition=first/7/3")
        .send()
        .await
        .assert_text("book 7 volume 3 first/first");
}

#[tokio::test]
async fn test_collection_wrapping_follows_config() {
    let store = Bookstore::stocked();

    let plain = client(&store).get("/bookstore/books").send().await;
    plain.assert_json_field("0.title", &json!("Dune"));

    let mut config = MeridianConfig::default();
    config.negotiation.wrap_collections = true;
    let wrapped = client_with(&config, &store).get("/bookstore/books").send().await;
    wrapped.assert_json_field("Book.1.title", &json!("Emma"));
}

#[tokio::test]
async fn test_request_id_header_from_config() {
    let mut config = MeridianConfig::default();
    config.dispatch.request_id_header = "x-correlation-id".to_string();
    let client = client_with(&config, &Bookstore::stocked());

    let response = client.get("/bookstore/1").send().await;
    assert!(response.header_str("x-correlation-id").is_some());
    response.assert_no_header("x-request-id");
}

#[tokio::test(start_paused = true)]
async fn test_suspension_times_out_with_configured_timeout() {
    let mut config = MeridianConfig::default();
    config.dispatch.suspend_timeout_ms = 50;
    let client = client_with(&config, &Bookstore::stocked());

    client
        .get("/bookstore/books/1/await")
        .send()
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
