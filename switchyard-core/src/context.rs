//! # Request Context
//!
//! The three value sources a handler can draw its arguments from:
//!
//! - [`RequestContext`] - per-request values plus the request path and the
//!   "response already sent" flag owned by the host framework
//! - [`Injectors`] - a flat, caller-supplied name → value table shared by every
//!   request; entries are either plain values or zero-argument factories
//! - [`Done`] - the completion signal a handler raises to stop the dispatch loop
//!
//! All three are cheap to clone; clones observe the same underlying state.

use crate::value::Value;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

// ============================================================================
// RequestContext
// ============================================================================

/// The request as seen by the router.
///
/// Hosts build one per request, seed it with whatever named values handlers
/// may ask for (route params, the authenticated user, the parsed body), and
/// flip [`mark_sent`](Self::mark_sent) once a response has been written.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    path: String,
    values: RwLock<HashMap<String, Value>>,
    sent: AtomicBool,
}

impl RequestContext {
    /// Create a context for the given request path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                path: path.into(),
                values: RwLock::new(HashMap::new()),
                sent: AtomicBool::new(false),
            }),
        }
    }

    /// Builder-style insert.
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Store a named value, returning the previous one.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner
            .values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.into(), value.into())
    }

    /// Look up a named value.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner
            .values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// Whether a value is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Record that the host has already sent a response.
    pub fn mark_sent(&self) {
        self.inner.sent.store(true, Ordering::Release);
    }

    /// Whether a response has already been sent.
    pub fn is_sent(&self) -> bool {
        self.inner.sent.load(Ordering::Acquire)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("path", &self.inner.path)
            .field("sent", &self.is_sent())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Injectors
// ============================================================================

type Factory = Arc<dyn Fn() -> Value + Send + Sync>;

/// A single injector entry.
#[derive(Clone)]
pub enum Injector {
    /// Bound as-is.
    Value(Value),
    /// Invoked with no arguments on every binding; the result is bound.
    Factory(Factory),
}

impl Injector {
    /// Produce the value to bind.
    pub fn resolve(&self) -> Value {
        match self {
            Injector::Value(value) => value.clone(),
            Injector::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injector::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Injector::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Name → injector table supplied by the router's owner.
#[derive(Clone, Debug, Default)]
pub struct Injectors {
    entries: HashMap<String, Injector>,
}

impl Injectors {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plain value.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_value(name, value);
        self
    }

    /// Register a factory.
    pub fn with_factory<F, V>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.insert_factory(name, factory);
        self
    }

    /// Register a plain value (mutable version).
    pub fn insert_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries
            .insert(name.into(), Injector::Value(value.into()));
    }

    /// Register a factory (mutable version).
    pub fn insert_factory<F, V>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.entries.insert(
            name.into(),
            Injector::Factory(Arc::new(move || factory().into())),
        );
    }

    /// Resolve `name`, invoking its factory if it has one.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        self.entries.get(name).map(Injector::resolve)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered injectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Done
// ============================================================================

/// The completion callback bound to parameters named `done`.
///
/// Calling [`signal`](Self::signal) tells the dispatch loop not to try any
/// further candidates for the current request.
#[derive(Clone, Debug, Default)]
pub struct Done(Arc<AtomicBool>);

impl Done {
    /// Create an unsignaled completion callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal completion.
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether completion was signaled.
    pub fn is_signaled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
