//! # switchyard - Convention-Based Request Router
//!
//! `switchyard` discovers route namespaces ("components") and their handler
//! modules ("controllers") from a directory tree, loads them asynchronously,
//! and resolves each request path to an ordered list of candidate handlers,
//! invoking them one by one until one signals completion.
//!
//! ## Layout
//!
//! ```text
//! components/
//!   index/controllers/index.rs     catch-all
//!   blog/controllers/index.rs      /blog, /blog/<method>
//!   blog/controllers/posts.rs      /blog/posts/<method>
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! #[handler]
//! async fn list(user_id: String, done: Done) {
//!     // ...
//!     done.signal();
//! }
//!
//! let loader = StaticLoader::new().with("blog/index", || module!(list));
//! let router = Router::builder()
//!     .with_loader(loader)
//!     .inject_value("site", "example.org")
//!     .build();
//! router.init(["./components"]).await?;
//!
//! let ctx = RequestContext::new("/blog/list").with("user_id", "u1");
//! router.middleware(&ctx, || async { /* next */ }).await?;
//! ```
//!
//! ## Lifecycle
//!
//! Readiness flows bottom-up: a controller is ready once its module is
//! loaded; a component once every controller is ready; the router once every
//! component has settled. Every transition is reported as a [`RouterEvent`]
//! that propagates from the emitting node to the router's root [`EventBus`].

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

extern crate self as switchyard;

mod bound;
mod component;
mod controller;
mod lifecycle;
mod macros;
mod options;
mod registry;
mod router;

pub use bound::BoundHandler;
pub use component::Component;
pub use controller::{Controller, DEFAULT_METHOD, MethodTable};
pub use lifecycle::{LifecycleState, ReadinessBarrier};
pub use options::{RouterBuilder, RouterOptions};
pub use registry::{INDEX, Layout, Registry, Route};
pub use router::{Dispatched, Router};

pub use switchyard_core::{
    Arg, Args, CONTEXT, DONE, Done, ExtractError, FromArg, Injector, Injectors, Param, ParamCache,
    ParamList, RequestContext, Value,
};
pub use switchyard_core::{
    BoxError, DiscoveryError, DispatchError, LoadError, ProcedureError, SwitchyardError,
};
pub use switchyard_core::{
    ComponentId, ControllerId, EventBus, EventKind, EventListener, Origin, RouterEvent,
    RoutingEvent, Subscription,
};
pub use switchyard_core::{
    Discovery, DynDiscovery, DynHandler, DynModuleLoader, Handler, HandlerFn, IntoHandlerResult,
    Module, ModuleLoader, Reloadable, SyncHandlerFn, handler_fn, sync_handler_fn,
};

pub use switchyard_std::{FsDiscovery, ReloadWatcher, StaticLoader};

#[cfg(feature = "macros")]
pub use switchyard_macros::handler;

/// Standard listener implementations.
pub mod listeners {
    #![allow(clippy::wildcard_imports)]
    pub use switchyard_std::listeners::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use switchyard_std::testing::*;
}

/// Prelude module - common imports for Switchyard.
///
/// # Usage
///
/// ```rust,ignore
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Args, BoxError, DispatchError, Done, EventKind, Handler, Injectors, Module, RequestContext,
        Router, RouterBuilder, RouterEvent, StaticLoader, SwitchyardError, Value, handler_fn,
        module, sync_handler_fn,
    };

    #[cfg(feature = "macros")]
    pub use crate::handler;
}
