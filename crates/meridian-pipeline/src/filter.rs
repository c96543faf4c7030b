//! Request and response filters.
//!
//! Three kinds of filter wrap a resource method:
//!
//! | Kind | Runs | Sees | Can abort |
//! |------|------|------|-----------|
//! | [`PreMatchFilter`] | before matching | mutable request | yes |
//! | [`RequestFilter`] | after binding | mutable context, request | yes |
//! | [`ResponseFilter`] | after invocation | context, mutable response | no |
//!
//! Within a kind, filters run by ascending [`priority`](RequestFilter::priority)
//! and then in registration order.
//!
//! # Example
//!
//! ```
//! use meridian_core::{RequestContext, RequestParts};
//! use meridian_pipeline::{FilterAction, FnRequestFilter, RequestFilter};
//!
//! let audit = FnRequestFilter::new("audit", |ctx: &mut RequestContext, _: &RequestParts| {
//!     ctx.set_property("audit", true);
//!     FilterAction::Continue
//! })
//! .with_priority(100);
//! assert_eq!(audit.priority(), 100);
//! ```

use std::sync::Arc;

use meridian_core::{BoxFuture, RequestContext, RequestParts, ResourceResponse};

/// Priority given to filters that do not choose one.
pub const DEFAULT_PRIORITY: i32 = 5000;

/// What a filter decided.
#[derive(Debug)]
pub enum FilterAction {
    /// Carry on.
    Continue,
    /// Stop and answer with this response.
    Abort(ResourceResponse),
}

/// Runs before the request is matched.
pub trait PreMatchFilter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Inspects or rewrites the request.
    fn filter<'a>(&'a self, request: &'a mut RequestParts) -> BoxFuture<'a, FilterAction>;
}

/// Runs after binding, before the resource method.
pub trait RequestFilter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Inspects the request and may record properties on the context.
    fn filter<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: &'a RequestParts,
    ) -> BoxFuture<'a, FilterAction>;
}

/// Runs on success and mapped-fault responses.
pub trait ResponseFilter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Rewrites status, headers or entity.
    fn filter<'a>(
        &'a self,
        ctx: &'a RequestContext,
        response: &'a mut ResourceResponse,
    ) -> BoxFuture<'a, ()>;
}

/// A pre-match filter backed by a synchronous closure.
pub struct FnPreMatchFilter<F> {
    name: &'static str,
    priority: i32,
    func: F,
}

impl<F> FnPreMatchFilter<F>
where
    F: Fn(&mut RequestParts) -> FilterAction + Send + Sync + 'static,
{
    /// Wraps a closure.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self {
            name,
            priority: DEFAULT_PRIORITY,
            func,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl<F> PreMatchFilter for FnPreMatchFilter<F>
where
    F: Fn(&mut RequestParts) -> FilterAction + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn filter<'a>(&'a self, request: &'a mut RequestParts) -> BoxFuture<'a, FilterAction> {
        let action = (self.func)(request);
        Box::pin(async move { action })
    }
}

/// A request filter backed by a synchronous closure.
pub struct FnRequestFilter<F> {
    name: &'static str,
    priority: i32,
    func: F,
}

impl<F> FnRequestFilter<F>
where
    F: Fn(&mut RequestContext, &RequestParts) -> FilterAction + Send + Sync + 'static,
{
    /// Wraps a closure.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self {
            name,
            priority: DEFAULT_PRIORITY,
            func,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl<F> RequestFilter for FnRequestFilter<F>
where
    F: Fn(&mut RequestContext, &RequestParts) -> FilterAction + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn filter<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: &'a RequestParts,
    ) -> BoxFuture<'a, FilterAction> {
        let action = (self.func)(ctx, request);
        Box::pin(async move { action })
    }
}

/// A response filter backed by a synchronous closure.
pub struct FnResponseFilter<F> {
    name: &'static str,
    priority: i32,
    func: F,
}

impl<F> FnResponseFilter<F>
where
    F: Fn(&RequestContext, &mut ResourceResponse) + Send + Sync + 'static,
{
    /// Wraps a closure.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self {
            name,
            priority: DEFAULT_PRIORITY,
            func,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl<F> ResponseFilter for FnResponseFilter<F>
where
    F: Fn(&RequestContext, &mut ResourceResponse) + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn filter<'a>(
        &'a self,
        ctx: &'a RequestContext,
        response: &'a mut ResourceResponse,
    ) -> BoxFuture<'a, ()> {
        (self.func)(ctx, response);
        Box::pin(async {})
    }
}

/// Filters of one kind in execution order.
pub(crate) struct FilterChain<T: ?Sized> {
    entries: Vec<(i32, Arc<T>)>,
}

impl<T: ?Sized> Default for FilterChain<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> Clone for FilterChain<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized> FilterChain<T> {
    /// Inserts after every filter with the same or a lower priority.
    pub(crate) fn add(&mut self, priority: i32, filter: Arc<T>) {
        let at = self.entries.partition_point(|(p, _)| *p <= priority);
        self.entries.insert(at, (priority, filter));
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter().map(|(_, filter)| filter)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode, Uri};

    fn request() -> RequestParts {
        RequestParts::new(
            Method::POST,
            Uri::from_static("/books"),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    #[test]
    fn test_chain_orders_by_priority_then_registration() {
        let mut chain: FilterChain<str> = FilterChain::default();
        chain.add(DEFAULT_PRIORITY, Arc::from("first-default"));
        chain.add(10, Arc::from("early"));
        chain.add(DEFAULT_PRIORITY, Arc::from("second-default"));
        chain.add(9000, Arc::from("late"));
        chain.add(10, Arc::from("early-two"));

        let order: Vec<&str> = chain.iter().map(AsRef::as_ref).collect();
        assert_eq!(
            order,
            ["early", "early-two", "first-default", "second-default", "late"]
        );
        assert_eq!(chain.len(), 5);
    }

    #[tokio::test]
    async fn test_pre_match_rewrites_method() {
        let filter = FnPreMatchFilter::new("override", |request: &mut RequestParts| {
            request.set_method(Method::PUT);
            FilterAction::Continue
        });
        let mut request = request();
        assert!(matches!(filter.filter(&mut request).await, FilterAction::Continue));
        assert_eq!(request.method(), Method::PUT);
    }

    #[tokio::test]
    async fn test_request_filter_sets_flag_and_aborts() {
        let filter = FnRequestFilter::new("gate", |ctx: &mut RequestContext, _: &RequestParts| {
            ctx.set_property("seen", true);
            FilterAction::Abort(ResourceResponse::status(StatusCode::FORBIDDEN))
        })
        .with_priority(1);
        let mut ctx = RequestContext::new();
        let action = filter.filter(&mut ctx, &request()).await;
        assert!(ctx.flag("seen"));
        assert!(matches!(
            action,
            FilterAction::Abort(response) if response.status_code() == StatusCode::FORBIDDEN
        ));
        assert_eq!(filter.priority(), 1);
    }

    #[tokio::test]
    async fn test_response_filter_adds_header() {
        let filter = FnResponseFilter::new(
            "stamp",
            |_: &RequestContext, response: &mut ResourceResponse| {
                response
                    .headers_mut()
                    .insert("x-filtered", http::HeaderValue::from_static("yes"));
            },
        );
        let mut response = ResourceResponse::no_content();
        filter.filter(&RequestContext::new(), &mut response).await;
        assert_eq!(response.header_str("x-filtered"), Some("yes"));
        assert_eq!(filter.priority(), DEFAULT_PRIORITY);
    }
}
