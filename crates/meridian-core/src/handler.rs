//! Type-erased resource method handlers.
//!
//! Resource classes are written against their own type `R`. The registry
//! stores every method behind [`MethodHandler`] or [`LocatorHandler`], which
//! take the instance as [`Instance`] and downcast it back to `R` on call.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::args::Arguments;
use crate::context::RequestContext;
use crate::fault::AppFault;
use crate::response::ResourceResponse;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A resource instance with its type erased.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// What a resource method returns.
pub type HandlerResult = Result<ResourceResponse, AppFault>;

/// What a sub-resource locator returns.
pub type LocatorResult = Result<Instance, AppFault>;

/// Invokes a resource method on an erased instance.
pub trait MethodHandler: Send + Sync + 'static {
    /// Calls the method.
    fn call(
        &self,
        instance: Instance,
        args: Arguments,
        ctx: Arc<RequestContext>,
    ) -> BoxFuture<'static, HandlerResult>;
}

/// Invokes a sub-resource locator on an erased instance.
pub trait LocatorHandler: Send + Sync + 'static {
    /// Calls the locator, returning the sub-resource instance.
    fn call(
        &self,
        instance: Instance,
        args: Arguments,
        ctx: Arc<RequestContext>,
    ) -> BoxFuture<'static, LocatorResult>;
}

/// The instance handed to a handler was not of the expected type.
#[derive(Debug, thiserror::Error)]
#[error("resource instance is not a {expected}")]
pub struct InstanceMismatch {
    expected: &'static str,
}

impl crate::fault::Fault for InstanceMismatch {}

fn downcast<R: Send + Sync + 'static>(instance: Instance) -> Result<Arc<R>, AppFault> {
    instance.downcast::<R>().map_err(|_| {
        AppFault::from(InstanceMismatch {
            expected: std::any::type_name::<R>(),
        })
    })
}

/// A closure-backed [`MethodHandler`].
pub struct FnHandler<R, F> {
    func: F,
    _resource: PhantomData<fn() -> R>,
}

impl<R, F> FnHandler<R, F> {
    /// Wraps a closure.
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Arc<R>, Arguments, Arc<RequestContext>) -> Fut,
        Fut: Future<Output = HandlerResult>,
    {
        Self {
            func,
            _resource: PhantomData,
        }
    }
}

impl<R, F, Fut> MethodHandler for FnHandler<R, F>
where
    R: Send + Sync + 'static,
    F: Fn(Arc<R>, Arguments, Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        instance: Instance,
        args: Arguments,
        ctx: Arc<RequestContext>,
    ) -> BoxFuture<'static, HandlerResult> {
        match downcast::<R>(instance) {
            Ok(resource) => Box::pin((self.func)(resource, args, ctx)),
            Err(fault) => Box::pin(async move { Err(fault) }),
        }
    }
}

/// A closure-backed [`LocatorHandler`] returning a sub-resource `S`.
pub struct FnLocator<R, S, F> {
    func: F,
    _types: PhantomData<fn() -> (R, S)>,
}

impl<R, S, F> FnLocator<R, S, F> {
    /// Wraps a closure.
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Arc<R>, Arguments, Arc<RequestContext>) -> Fut,
        Fut: Future<Output = Result<Arc<S>, AppFault>>,
    {
        Self {
            func,
            _types: PhantomData,
        }
    }
}

impl<R, S, F, Fut> LocatorHandler for FnLocator<R, S, F>
where
    R: Send + Sync + 'static,
    S: Send + Sync + 'static,
    F: Fn(Arc<R>, Arguments, Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<S>, AppFault>> + Send + 'static,
{
    fn call(
        &self,
        instance: Instance,
        args: Arguments,
        ctx: Arc<RequestContext>,
    ) -> BoxFuture<'static, LocatorResult> {
        match downcast::<R>(instance) {
            Ok(resource) => {
                let fut = (self.func)(resource, args, ctx);
                Box::pin(async move { fut.await.map(|sub| sub as Instance) })
            }
            Err(fault) => Box::pin(async move { Err(fault) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use http::StatusCode;

    struct Greeter {
        greeting: &'static str,
    }

    struct Chapter(u32);

    #[tokio::test]
    async fn test_fn_handler_downcasts() {
        let handler = FnHandler::new(|g: Arc<Greeter>, _args, _ctx| async move {
            Ok(ResourceResponse::ok(Entity::text(g.greeting)))
        });
        let instance: Instance = Arc::new(Greeter { greeting: "hi" });
        let response = handler
            .call(instance, Arguments::new(), Arc::new(RequestContext::new()))
            .await
            .unwrap();
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.entity(), Some(&Entity::text("hi")));
    }

    #[tokio::test]
    async fn test_wrong_instance_is_fault() {
        let handler = FnHandler::new(|_: Arc<Greeter>, _args, _ctx| async move {
            Ok(ResourceResponse::no_content())
        });
        let instance: Instance = Arc::new(42_u8);
        let fault = handler
            .call(instance, Arguments::new(), Arc::new(RequestContext::new()))
            .await
            .unwrap_err();
        assert!(fault.is::<InstanceMismatch>());
    }

    #[tokio::test]
    async fn test_locator_returns_sub_resource() {
        let locator = FnLocator::new(|_: Arc<Greeter>, _args, _ctx| async move {
            Ok(Arc::new(Chapter(3)))
        });
        let instance: Instance = Arc::new(Greeter { greeting: "hi" });
        let sub = locator
            .call(instance, Arguments::new(), Arc::new(RequestContext::new()))
            .await
            .unwrap();
        assert_eq!(sub.downcast::<Chapter>().unwrap().0, 3);
    }
}
