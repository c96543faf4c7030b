//! Resource classes and their operations.
//!
//! A [`ResourceClass`] is declared with builders and handed to the
//! [`RouteRegistry`](crate::RouteRegistry), which validates it and erases it
//! into [`ResourceMethod`]s.
//!
//! # Example
//!
//! ```
//! use meridian_core::{Entity, Operation, ParamType, ParameterSpec, ResourceClass, ResourceResponse};
//! use std::sync::Arc;
//!
//! struct BookStore;
//!
//! let class = ResourceClass::new("/bookstore")
//!     .singleton(Arc::new(BookStore))
//!     .operation(
//!         Operation::get("/books/{id}")
//!             .named("get_book")
//!             .produces("application/json")
//!             .param(ParameterSpec::path("id", ParamType::I64))
//!             .handle(|_store: Arc<BookStore>, args, _ctx| async move {
//!                 let id: i64 = args.value("id")?;
//!                 Ok(ResourceResponse::ok(Entity::json(&id)?))
//!             }),
//!     );
//! assert_eq!(class.name(), "BookStore");
//! ```

use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use http::Method;
use meridian_router::{MediaType, UriTemplate};

use crate::args::Arguments;
use crate::context::RequestContext;
use crate::di::{Container, InjectionError};
use crate::entity::TypeDescriptor;
use crate::fault::AppFault;
use crate::handler::{FnHandler, FnLocator, HandlerResult, Instance, LocatorHandler, MethodHandler};
use crate::model::ParameterSpec;

type Factory = Arc<dyn Fn(&Container) -> Result<Instance, InjectionError> + Send + Sync>;

/// How instances of a resource class are obtained.
#[derive(Clone)]
pub enum Lifecycle {
    /// One instance shared by every request.
    Singleton(Instance),
    /// A fresh instance per request.
    PerRequest(Factory),
}

impl Lifecycle {
    /// Obtains the instance for one request.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError`] when a per-request factory fails.
    pub fn instance(&self, container: &Container) -> Result<Instance, InjectionError> {
        match self {
            Self::Singleton(instance) => Ok(Arc::clone(instance)),
            Self::PerRequest(factory) => factory(container),
        }
    }

    /// Returns true for singletons.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Singleton(_))
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton(_) => f.write_str("Singleton"),
            Self::PerRequest(_) => f.write_str("PerRequest"),
        }
    }
}

/// The erased callable behind a resource method.
#[derive(Clone)]
pub enum Invoker {
    /// A method producing a response.
    Method(Arc<dyn MethodHandler>),
    /// A locator producing a sub-resource instance.
    Locator(Arc<dyn LocatorHandler>),
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Method"),
            Self::Locator(_) => f.write_str("Locator"),
        }
    }
}

/// A sub-resource type returned by a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubResourceType {
    /// Type id of the sub-resource.
    pub id: TypeId,
    /// Type name, for messages.
    pub name: &'static str,
}

impl SubResourceType {
    /// The sub-resource type `S`.
    #[must_use]
    pub fn of<S: 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
        }
    }
}

/// Whether a method answers a verb or locates a sub-resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodKind {
    /// An HTTP verb.
    Verb(Method),
    /// A sub-resource locator.
    Locator(SubResourceType),
}

/// One declared operation of a resource class `R`.
pub struct Operation<R> {
    pub(crate) name: Option<String>,
    pub(crate) verb: Option<Method>,
    pub(crate) locator: Option<SubResourceType>,
    pub(crate) path: String,
    pub(crate) consumes: Vec<String>,
    pub(crate) produces: Vec<String>,
    pub(crate) params: Vec<ParameterSpec>,
    pub(crate) returns: TypeDescriptor,
    pub(crate) invoker: Option<Invoker>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Send + Sync + 'static> Operation<R> {
    /// An operation at `path` with no verb yet.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            name: None,
            verb: None,
            locator: None,
            path: path.into(),
            consumes: Vec::new(),
            produces: Vec::new(),
            params: Vec::new(),
            returns: TypeDescriptor::Unit,
            invoker: None,
            _resource: PhantomData,
        }
    }

    /// `GET` at `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::GET)
    }

    /// `POST` at `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::POST)
    }

    /// `PUT` at `path`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::PUT)
    }

    /// `DELETE` at `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::DELETE)
    }

    /// `PATCH` at `path`.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::PATCH)
    }

    /// `HEAD` at `path`.
    pub fn head(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::HEAD)
    }

    /// `OPTIONS` at `path`.
    pub fn options(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::OPTIONS)
    }

    /// A sub-resource locator at `path` returning an `S`.
    ///
    /// Matching continues on the rest of the path against the methods of
    /// the sub-resource class registered for `S`.
    pub fn locator<S, F, Fut>(path: impl Into<String>, func: F) -> Self
    where
        S: Send + Sync + 'static,
        F: Fn(Arc<R>, Arguments, Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<S>, AppFault>> + Send + 'static,
    {
        let mut op = Self::new(path);
        op.locator = Some(SubResourceType::of::<S>());
        op.invoker = Some(Invoker::Locator(Arc::new(FnLocator::<R, S, F>::new(func))));
        op
    }

    /// Sets the verb.
    #[must_use]
    pub fn verb(mut self, verb: Method) -> Self {
        self.verb = Some(verb);
        self
    }

    /// Names the operation. Unnamed operations are called `VERB path`.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a consumed media type.
    #[must_use]
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes.push(media_type.into());
        self
    }

    /// Adds a produced media type.
    #[must_use]
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces.push(media_type.into());
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Declares the return type.
    #[must_use]
    pub fn returns(mut self, descriptor: TypeDescriptor) -> Self {
        self.returns = descriptor;
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn handle<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(Arc<R>, Arguments, Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.invoker = Some(Invoker::Method(Arc::new(FnHandler::<R, F>::new(func))));
        self
    }

    pub(crate) fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            let verb = self
                .verb
                .as_ref()
                .map_or("LOCATOR", Method::as_str);
            format!("{verb} {}", self.path)
        })
    }
}

/// A resource class `R` with its base path, lifecycle and operations.
pub struct ResourceClass<R> {
    pub(crate) name: String,
    pub(crate) base: String,
    pub(crate) lifecycle: Option<Lifecycle>,
    pub(crate) operations: Vec<Operation<R>>,
}

impl<R: Send + Sync + 'static> ResourceClass<R> {
    /// A class rooted at `base`. Sub-resource classes usually pass `""`.
    pub fn new(base: impl Into<String>) -> Self {
        let full = std::any::type_name::<R>();
        let short = full.split('<').next().unwrap_or(full);
        Self {
            name: short.rsplit("::").next().unwrap_or(short).to_string(),
            base: base.into(),
            lifecycle: None,
            operations: Vec::new(),
        }
    }

    /// Overrides the class name used in logs and errors.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Shares one instance across requests.
    #[must_use]
    pub fn singleton(mut self, instance: Arc<R>) -> Self {
        self.lifecycle = Some(Lifecycle::Singleton(instance));
        self
    }

    /// Builds a fresh instance per request.
    #[must_use]
    pub fn per_request<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Container) -> Result<R, InjectionError> + Send + Sync + 'static,
    {
        self.lifecycle = Some(Lifecycle::PerRequest(Arc::new(move |container| {
            factory(container).map(|r| Arc::new(r) as Instance)
        })));
        self
    }

    /// Resolves the instance from the container on every request.
    #[must_use]
    pub fn injected(mut self) -> Self {
        self.lifecycle = Some(Lifecycle::PerRequest(Arc::new(|container| {
            container
                .resolve_required::<R>()
                .map(|r| r as Instance)
        })));
        self
    }

    /// Adds an operation.
    #[must_use]
    pub fn operation(mut self, op: Operation<R>) -> Self {
        self.operations.push(op);
        self
    }

    /// The class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A validated, type-erased resource method.
#[derive(Debug)]
pub struct ResourceMethod {
    pub(crate) id: usize,
    pub(crate) name: String,
    pub(crate) class: usize,
    pub(crate) class_name: String,
    pub(crate) kind: MethodKind,
    pub(crate) template: UriTemplate,
    pub(crate) consumes: Vec<MediaType>,
    pub(crate) produces: Vec<MediaType>,
    pub(crate) params: Vec<ParameterSpec>,
    pub(crate) returns: TypeDescriptor,
    pub(crate) invoker: Invoker,
}

impl ResourceMethod {
    /// Registration order across the whole registry.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the owning class in the route table.
    #[must_use]
    pub fn class(&self) -> usize {
        self.class
    }

    /// The owning class name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Verb or locator.
    #[must_use]
    pub fn kind(&self) -> &MethodKind {
        &self.kind
    }

    /// The verb, for non-locators.
    #[must_use]
    pub fn verb(&self) -> Option<&Method> {
        match &self.kind {
            MethodKind::Verb(verb) => Some(verb),
            MethodKind::Locator(_) => None,
        }
    }

    /// Returns true for sub-resource locators.
    #[must_use]
    pub fn is_locator(&self) -> bool {
        matches!(self.kind, MethodKind::Locator(_))
    }

    /// The compiled template, class base included.
    #[must_use]
    pub fn template(&self) -> &UriTemplate {
        &self.template
    }

    /// Consumed media types; `*/*` when none were declared.
    #[must_use]
    pub fn consumes(&self) -> &[MediaType] {
        &self.consumes
    }

    /// Produced media types; `*/*` when none were declared.
    #[must_use]
    pub fn produces(&self) -> &[MediaType] {
        &self.produces
    }

    /// Parameters in binding order.
    #[must_use]
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// The declared return type.
    #[must_use]
    pub fn returns(&self) -> &TypeDescriptor {
        &self.returns
    }

    /// The callable.
    #[must_use]
    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}
