//! # Module Loading
//!
//! A controller is backed by one module: an ordered set of named exports.
//! The engine obtains modules through a [`ModuleLoader`], keyed by the
//! controller's source path. `switchyard-std` ships a registration-based
//! loader; hosts with a plugin system can implement their own.

use crate::{
    error::LoadError,
    handler::{DynHandler, Handler},
};
use std::{fmt, future::Future, path::Path, pin::Pin, sync::Arc};

// ============================================================================
// Module
// ============================================================================

/// The named exports of one controller module.
///
/// Export order is preserved. Exporting a name twice replaces the earlier
/// handler in place.
#[derive(Clone, Default)]
pub struct Module {
    exports: Vec<(String, Arc<dyn DynHandler>)>,
}

impl Module {
    /// Create a module without exports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an export.
    pub fn export<H: Handler>(&mut self, name: impl Into<String>, handler: H) -> &mut Self {
        self.export_dyn(name, Arc::new(handler))
    }

    /// Add an already type-erased export.
    pub fn export_dyn(&mut self, name: impl Into<String>, handler: Arc<dyn DynHandler>) -> &mut Self {
        let name = name.into();
        match self.exports.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = handler,
            None => self.exports.push((name, handler)),
        }
        self
    }

    /// Builder-style [`export`](Self::export).
    pub fn with<H: Handler>(mut self, name: impl Into<String>, handler: H) -> Self {
        self.export(name, handler);
        self
    }

    /// Look up an export.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynHandler>> {
        self.exports
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, handler)| handler)
    }

    /// Iterate over exports in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn DynHandler>)> {
        self.exports.iter().map(|(name, handler)| (name.as_str(), handler))
    }

    /// Exported names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|(name, _)| name.as_str())
    }

    /// Number of exports.
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Whether nothing is exported.
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ============================================================================
// Loader traits
// ============================================================================

/// Imports controller modules.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot load controller modules",
    label = "missing `ModuleLoader` implementation",
    note = "Use `StaticLoader` from `switchyard-std` or implement `ModuleLoader`."
)]
pub trait ModuleLoader: Send + Sync + 'static {
    /// Import the module backing the controller at `path`.
    fn load(&self, path: &Path) -> impl Future<Output = Result<Module, LoadError>> + Send;
}

impl<T: ModuleLoader> ModuleLoader for Arc<T> {
    fn load(&self, path: &Path) -> impl Future<Output = Result<Module, LoadError>> + Send {
        (**self).load(path)
    }
}

/// Dynamic object-safe version of [`ModuleLoader`].
pub trait DynModuleLoader: Send + Sync + 'static {
    /// See [`ModuleLoader::load`].
    fn load_dyn<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<Module, LoadError>> + Send + 'a>>;
}

impl<T: ModuleLoader> DynModuleLoader for T {
    fn load_dyn<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<Module, LoadError>> + Send + 'a>> {
        Box::pin(self.load(path))
    }
}

/// Something backed by a source file that can be re-imported in place.
pub trait Reloadable: Send + Sync + 'static {
    /// The watched source file.
    fn source(&self) -> &Path;

    /// Re-import the source, replacing the current exports atomically.
    fn reload(&self) -> impl Future<Output = Result<(), LoadError>> + Send;
}
