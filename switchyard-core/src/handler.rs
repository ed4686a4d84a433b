//! # Handler Layer
//!
//! A handler is one exported method of a controller module. It declares its
//! parameter names through a descriptor string and receives the positional
//! [`Args`] the binder produced for those names.
//!
//! # Usage Patterns
//!
//! 1. **Attribute macro**: `#[handler] async fn list(user_id: String, done: Done)`,
//!    the descriptor is generated from the signature
//! 2. **Async closure**: `handler_fn("user_id, done", |args| async move { ... })`
//! 3. **Sync closure**: `sync_handler_fn("ctx", |args| { ... })`
//! 4. **Struct implementation**: `impl Handler for MyHandler`
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Handler`] uses native `async fn` in traits. Controllers store handlers as
//! `Arc<dyn DynHandler>`; every `Handler` is a `DynHandler` automatically.

use crate::{args::Args, error::BoxError};
use std::{any::TypeId, future::Future, pin::Pin};

/// Trait for converting a handler's output into the dispatch result.
///
/// # Default Implementations
///
/// - `()` → success
/// - `Result<T, E>` → delegates to `T` or propagates `E`
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid handler return type",
    label = "missing `IntoHandlerResult` implementation",
    note = "Handlers must return `()` or a `Result` whose error converts into `BoxError`."
)]
pub trait IntoHandlerResult {
    /// Normalize the output.
    fn into_handler_result(self) -> Result<(), BoxError>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: IntoHandlerResult,
    E: Into<BoxError>,
{
    fn into_handler_result(self) -> Result<(), BoxError> {
        match self {
            Ok(t) => t.into_handler_result(),
            Err(e) => Err(e.into()),
        }
    }
}

/// An exported controller method.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Handler`",
    label = "missing `Handler` implementation",
    note = "Annotate the function with `#[handler]` or wrap a closure with `handler_fn`."
)]
pub trait Handler: Send + Sync + 'static {
    /// Comma-separated parameter names, see [`ParamList`](crate::ParamList).
    fn descriptor(&self) -> &str;

    /// Invoke the handler with bound arguments.
    fn call(&self, args: Args) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Dynamic object-safe version of [`Handler`].
pub trait DynHandler: Send + Sync + 'static {
    /// Identity of the concrete handler type, used to cache its descriptor.
    fn handler_id(&self) -> TypeId;

    /// See [`Handler::descriptor`].
    fn descriptor_dyn(&self) -> &str;

    /// See [`Handler::call`].
    fn call_dyn(&self, args: Args) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + '_>>;
}

// Blanket implementation: Any type implementing Handler implements DynHandler automatically.
impl<T: Handler> DynHandler for T {
    fn handler_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn descriptor_dyn(&self) -> &str {
        self.descriptor()
    }

    fn call_dyn(&self, args: Args) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + '_>> {
        Box::pin(self.call(args))
    }
}

/// An asynchronous closure with an explicit descriptor.
pub struct HandlerFn<F> {
    descriptor: String,
    func: F,
}

/// Wrap an async closure as a handler.
///
/// ```rust,ignore
/// let show = handler_fn("id, done", |mut args| async move {
///     let id: String = args.extract(0)?;
///     let done: Done = args.extract(1)?;
///     done.signal();
///     Ok::<_, BoxError>(())
/// });
/// ```
pub fn handler_fn<F, Fut, R>(descriptor: impl Into<String>, func: F) -> HandlerFn<F>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send,
    R: IntoHandlerResult,
{
    HandlerFn {
        descriptor: descriptor.into(),
        func,
    }
}

impl<F, Fut, R> Handler for HandlerFn<F>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send,
    R: IntoHandlerResult,
{
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    async fn call(&self, args: Args) -> Result<(), BoxError> {
        (self.func)(args).await.into_handler_result()
    }
}

/// A synchronous closure with an explicit descriptor.
pub struct SyncHandlerFn<F> {
    descriptor: String,
    func: F,
}

/// Wrap a synchronous closure as a handler.
pub fn sync_handler_fn<F, R>(descriptor: impl Into<String>, func: F) -> SyncHandlerFn<F>
where
    F: Fn(Args) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    SyncHandlerFn {
        descriptor: descriptor.into(),
        func,
    }
}

impl<F, R> Handler for SyncHandlerFn<F>
where
    F: Fn(Args) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    async fn call(&self, args: Args) -> Result<(), BoxError> {
        (self.func)(args).into_handler_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args::Arg, value::Value};
    use std::io;

    #[tokio::test]
    async fn test_async_closure_handler() {
        let handler = handler_fn("name", |mut args: Args| async move {
            let name: String = args.extract(0)?;
            if name == "bad" {
                return Err(io::Error::other("bad name").into());
            }
            Ok::<_, BoxError>(())
        });

        assert_eq!(handler.descriptor(), "name");
        let ok = handler
            .call(Args::new(vec![Arg::Value(Value::from("good"))]))
            .await;
        assert!(ok.is_ok());

        let err = handler
            .call(Args::new(vec![Arg::Value(Value::from("bad"))]))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_sync_closure_through_dyn() {
        let handler = sync_handler_fn("", |_args: Args| ());
        let erased: &dyn DynHandler = &handler;
        assert_eq!(erased.descriptor_dyn(), "");
        assert!(erased.call_dyn(Args::default()).await.is_ok());
    }

    #[test]
    fn test_handler_identity_is_per_type() {
        let a = sync_handler_fn("", |_args: Args| ());
        let b = sync_handler_fn("", |_args: Args| ());
        assert_ne!(DynHandler::handler_id(&a), DynHandler::handler_id(&b));
    }
}
