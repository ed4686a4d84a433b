//! The invokable form of an exported controller method.

use std::{fmt, sync::Arc};
use switchyard_core::{
    ControllerId, DispatchError, Done, DynHandler, EventBus, Injectors, ParamList, RequestContext,
    RouterEvent, RoutingEvent, bind,
};

/// A handler wrapped with parameter binding and routing notification.
///
/// Cheap to clone. Holds the parsed descriptor, so invoking it never parses.
#[derive(Clone)]
pub struct BoundHandler {
    inner: Arc<BoundInner>,
}

struct BoundInner {
    method: String,
    controller: ControllerId,
    handler: Arc<dyn DynHandler>,
    params: Arc<ParamList>,
    bus: EventBus,
}

impl BoundHandler {
    pub(crate) fn new(
        method: impl Into<String>,
        controller: ControllerId,
        handler: Arc<dyn DynHandler>,
        params: Arc<ParamList>,
        bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(BoundInner {
                method: method.into(),
                controller,
                handler,
                params,
                bus,
            }),
        }
    }

    /// Exported name.
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// Identity of the owning controller.
    pub fn controller(&self) -> &ControllerId {
        &self.inner.controller
    }

    /// Declared parameters.
    pub fn params(&self) -> &ParamList {
        &self.inner.params
    }

    /// Whether two bound handlers share the same wrapped state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Emit a routing event, bind arguments, and run the handler.
    ///
    /// Handler errors are returned as [`DispatchError::Handler`], never
    /// swallowed.
    pub async fn invoke(
        &self,
        ctx: &RequestContext,
        done: &Done,
        injectors: &Injectors,
    ) -> Result<(), DispatchError> {
        let inner = &self.inner;
        inner.bus.emit(RouterEvent::Routing(RoutingEvent {
            controller: inner.controller.clone(),
            request_path: ctx.path().to_owned(),
            method: inner.method.clone(),
        }));

        let args = bind(&inner.params, ctx, injectors, done);
        inner
            .handler
            .call_dyn(args)
            .await
            .map_err(|source| DispatchError::Handler {
                component: inner.controller.component.clone(),
                controller: inner.controller.name.clone(),
                method: inner.method.clone(),
                source,
            })
    }
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler")
            .field("controller", &self.inner.controller.to_string())
            .field("method", &self.inner.method)
            .field("params", &self.inner.params.names().collect::<Vec<_>>())
            .finish()
    }
}
