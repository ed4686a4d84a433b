//! # switchyard-core
//!
//! Core types for the Switchyard convention-based request router.
//!
//! This crate has minimal dependencies and is meant to be imported by code
//! that exports controller modules or plugs in a custom discovery or loading
//! strategy without pulling in the full engine.
//!
//! # Layers
//!
//! ## Values and Binding
//!
//! A request carries a [`RequestContext`]; the router owner supplies
//! [`Injectors`]; every dispatch creates a [`Done`] completion signal. The
//! [binder](bind) maps a handler's declared parameter names onto those three
//! sources and produces positional [`Args`].
//!
//! ## Handlers
//!
//! [`Handler`] is one exported controller method. Its descriptor names its
//! parameters ([`ParamList`]); parsed descriptors are cached per handler
//! identity in a [`ParamCache`].
//!
//! ## Collaborators
//!
//! - [`Discovery`] - enumerates component directories and controller files
//! - [`ModuleLoader`] - imports the [`Module`] backing a controller
//! - [`Reloadable`] - an entity that can re-import its source in place
//!
//! ## Events
//!
//! Lifecycle and routing notifications are [`RouterEvent`]s travelling up an
//! [`EventBus`] tree.
//!
//! # Error Types
//!
//! - [`SwitchyardError`] - Top-level error type
//! - [`ProcedureError`] - One-time operations invoked twice
//! - [`LoadError`] - Module import failures
//! - [`DiscoveryError`] - Enumeration failures
//! - [`DispatchError`] - Dispatch failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod args;
mod binder;
mod bus;
mod context;
mod discovery;
mod error;
mod event;
mod handler;
mod loader;
mod params;
mod value;

// Re-exports
pub use args::{Arg, Args, ExtractError, FromArg};
pub use binder::{CONTEXT, DONE, bind, resolve};
pub use bus::{EventBus, EventListener, Subscription};
pub use context::{Done, Injector, Injectors, RequestContext};
pub use discovery::{Discovery, DynDiscovery, entity_name};
pub use error::{
    BoxError, DiscoveryError, DispatchError, LoadError, ProcedureError, SwitchyardError,
};
pub use event::{ComponentId, ControllerId, EventKind, Origin, RouterEvent, RoutingEvent};
pub use handler::{
    DynHandler, Handler, HandlerFn, IntoHandlerResult, SyncHandlerFn, handler_fn, sync_handler_fn,
};
pub use loader::{DynModuleLoader, Module, ModuleLoader, Reloadable};
pub use params::{Param, ParamCache, ParamList};
pub use value::Value;
