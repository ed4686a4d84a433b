//! # Router
//!
//! The entry point the host framework calls once per request.
//!
//! ```rust,ignore
//! let router = Arc::new(Router::builder().with_loader(loader).build());
//! router.start(vec!["./components".into()]);
//!
//! // Per request, from the host's middleware chain:
//! router.middleware(&ctx, || next(ctx)).await?;
//! ```
//!
//! Requests arriving before the initial load has settled wait for it once;
//! afterwards the registry is used directly.

use crate::{
    lifecycle::{Lifecycle, LifecycleState},
    options::{RouterBuilder, RouterOptions},
    registry::Registry,
};
use std::{
    fmt,
    future::Future,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use switchyard_core::{
    DispatchError, Done, EventBus, EventListener, Origin, ProcedureError, RequestContext,
    RouterEvent, Subscription, SwitchyardError,
};
use tokio::{sync::broadcast, task::JoinHandle};

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatched {
    /// Number of handlers invoked.
    pub invoked: usize,
    /// Whether a handler signaled completion.
    pub completed: bool,
}

/// Convention-based request router.
pub struct Router {
    bus: EventBus,
    options: Arc<RouterOptions>,
    registry: Arc<Registry>,
    initialized: AtomicBool,
    lifecycle: Lifecycle,
}

impl Router {
    /// A router with default options.
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    /// Start configuring a router.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// A router with the given options.
    pub fn with_options(options: RouterOptions) -> Self {
        let options = Arc::new(options);
        let bus = EventBus::new();
        let registry = Arc::new(Registry::new(&bus, options.clone()));
        Self {
            bus,
            options,
            registry,
            initialized: AtomicBool::new(false),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Discover and load every component under `roots`.
    ///
    /// Resolves once loading has settled. Fails with
    /// [`ProcedureError::InitCalledTwice`] on a second call, or with the
    /// discovery error if the roots could not be enumerated, in which case
    /// the router stays unavailable.
    pub async fn init<I, P>(&self, roots: I) -> Result<(), SwitchyardError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(ProcedureError::InitCalledTwice("router".into()).into());
        }
        let roots: Vec<PathBuf> = roots.into_iter().map(Into::into).collect();
        self.lifecycle.set(LifecycleState::Loading);
        tracing::debug!(roots = ?roots, "Router loading");

        if let Err(err) = self.registry.load(&roots).await {
            self.lifecycle.set(LifecycleState::Failed(err.to_string()));
            tracing::warn!(error = %err, "Router failed to load");
            self.bus.emit(RouterEvent::Failed {
                origin: Origin::Router,
                reason: err.to_string(),
            });
            return Err(err);
        }

        self.lifecycle.set(LifecycleState::Loaded);
        self.bus.emit(RouterEvent::Load(Origin::Router));
        self.lifecycle.set(LifecycleState::Ready);
        tracing::debug!(components = self.registry.len(), "Router ready");
        self.bus.emit(RouterEvent::Ready(Origin::Router));
        Ok(())
    }

    /// Run [`init`](Self::init) in the background.
    pub fn start(self: &Arc<Self>, roots: Vec<PathBuf>) -> JoinHandle<Result<(), SwitchyardError>> {
        let router = self.clone();
        tokio::spawn(async move { router.init(roots).await })
    }

    /// Wait for the initial load to settle and return the registry.
    pub async fn components(&self) -> Result<Arc<Registry>, DispatchError> {
        match self.lifecycle.wait_for(LifecycleState::is_settled).await {
            LifecycleState::Failed(reason) => Err(DispatchError::Unavailable(reason)),
            _ => Ok(self.registry.clone()),
        }
    }

    /// Dispatch a request without continuing a middleware chain.
    ///
    /// Candidates run strictly in order. The loop stops once a handler
    /// signals completion or the response has been sent, and on the first
    /// handler error, which is returned.
    pub async fn dispatch(&self, ctx: &RequestContext) -> Result<Dispatched, DispatchError> {
        let registry = if self.is_ready() {
            self.registry.clone()
        } else {
            self.components().await?
        };

        let candidates = registry.match_path(ctx.path());
        tracing::trace!(path = ctx.path(), candidates = candidates.len(), "Dispatching");

        let done = Done::new();
        let mut outcome = Dispatched::default();
        for handler in candidates {
            if done.is_signaled() || ctx.is_sent() {
                break;
            }
            outcome.invoked += 1;
            handler.invoke(ctx, &done, &self.options.injectors).await?;
        }
        outcome.completed = done.is_signaled();
        Ok(outcome)
    }

    /// The middleware entry point.
    ///
    /// Dispatches the request, then always hands control to `next`, whether
    /// any handler matched or not. A handler error is returned instead and
    /// `next` is not called.
    pub async fn middleware<F, Fut>(&self, ctx: &RequestContext, next: F) -> Result<Fut::Output, DispatchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        self.dispatch(ctx).await?;
        Ok(next().await)
    }

    /// Attach a listener to the root of the event tree.
    pub fn on<L: EventListener>(&self, listener: L) -> Subscription {
        self.bus.on(listener)
    }

    /// Receive every event asynchronously.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.bus.subscribe()
    }

    /// The root event node.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The registry, whether or not loading has settled.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Effective options.
    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether the initial load has completed.
    pub fn is_ready(&self) -> bool {
        self.lifecycle.state().is_ready()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("state", &self.state())
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}
