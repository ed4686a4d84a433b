//! Router events.
//!
//! Every entity in the component tree reports its lifecycle through
//! [`RouterEvent`]s. Payloads carry identity fields by value, never a live
//! reference back into the tree.

use std::{fmt, path::PathBuf};

/// Identity of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerId {
    /// Owning component name.
    pub component: String,
    /// Controller name (file stem of its source).
    pub name: String,
    /// Source path of the controller module.
    pub path: PathBuf,
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.name)
    }
}

/// Identity of a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentId {
    /// Component name (directory name).
    pub name: String,
    /// The first directory the component was discovered in.
    pub path: PathBuf,
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The entity an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A controller.
    Controller(ControllerId),
    /// A component.
    Component(ComponentId),
    /// The component registry.
    Registry,
    /// The router.
    Router,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Controller(id) => write!(f, "controller {id}"),
            Origin::Component(id) => write!(f, "component {id}"),
            Origin::Registry => f.write_str("registry"),
            Origin::Router => f.write_str("router"),
        }
    }
}

/// Emitted by a handler wrapper right before the handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingEvent {
    /// The controller that owns the handler.
    pub controller: ControllerId,
    /// Path of the request being dispatched.
    pub request_path: String,
    /// Exported name of the handler.
    pub method: String,
}

/// Discriminant of [`RouterEvent`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`RouterEvent::Load`].
    Load,
    /// See [`RouterEvent::Ready`].
    Ready,
    /// See [`RouterEvent::Failed`].
    Failed,
    /// See [`RouterEvent::Routing`].
    Routing,
}

impl EventKind {
    /// Lowercase event name.
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Load => "load",
            EventKind::Ready => "ready",
            EventKind::Failed => "failed",
            EventKind::Routing => "routing",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event travelling up the component tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// Loading finished: a controller imported its module, a component
    /// enumerated its controllers, the registry enumerated its components.
    Load(Origin),
    /// The origin became ready.
    Ready(Origin),
    /// The origin failed to load and will not become ready.
    Failed {
        /// Who failed.
        origin: Origin,
        /// Rendered cause.
        reason: String,
    },
    /// A handler is about to be invoked.
    Routing(RoutingEvent),
}

impl RouterEvent {
    /// The event discriminant.
    pub fn kind(&self) -> EventKind {
        match self {
            RouterEvent::Load(_) => EventKind::Load,
            RouterEvent::Ready(_) => EventKind::Ready,
            RouterEvent::Failed { .. } => EventKind::Failed,
            RouterEvent::Routing(_) => EventKind::Routing,
        }
    }

    /// The entity the event is about. Routing events report their controller.
    pub fn origin(&self) -> Origin {
        match self {
            RouterEvent::Load(origin) | RouterEvent::Ready(origin) => origin.clone(),
            RouterEvent::Failed { origin, .. } => origin.clone(),
            RouterEvent::Routing(routing) => Origin::Controller(routing.controller.clone()),
        }
    }
}
