//! Registration-based module loading.
//!
//! Rust has no runtime import, so controller modules are registered with a
//! [`StaticLoader`] ahead of time under a key, and the loader resolves a
//! controller's source path to that key when the engine asks for it.
//!
//! A path resolves to, in order:
//!
//! 1. the full path, as registered verbatim;
//! 2. `"<component>/<controller>"`, where the controller is the file stem and
//!    the component is the directory two levels up (the component directory
//!    containing the controllers directory).
//!
//! Factories run on every load, so a reload picks up whatever is registered
//! at that moment.

use std::{
    collections::HashMap,
    fmt,
    path::Path,
    sync::{
        Arc, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};
use switchyard_core::{BoxError, LoadError, Module, ModuleLoader, entity_name};

type Factory = Arc<dyn Fn() -> Result<Module, BoxError> + Send + Sync>;

/// A [`ModuleLoader`] backed by an in-process table of module factories.
///
/// # Example
///
/// ```rust,ignore
/// let loader = StaticLoader::new()
///     .with("blog/index", || module!(list, show))
///     .with("index/index", || module!(default));
/// ```
#[derive(Default)]
pub struct StaticLoader {
    factories: RwLock<HashMap<String, Factory>>,
    loads: AtomicUsize,
}

impl StaticLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Module + Send + Sync + 'static,
    {
        self.register(key, factory);
        self
    }

    /// Register an infallible module factory, replacing any previous one.
    pub fn register<F>(&self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> Module + Send + Sync + 'static,
    {
        self.register_fallible(key, move || Ok(factory()));
    }

    /// Register a factory whose import may fail.
    pub fn register_fallible<F>(&self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Module, BoxError> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), Arc::new(factory));
    }

    /// Remove a registration.
    pub fn unregister(&self, key: &str) -> bool {
        self.factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key)
            .is_some()
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of load attempts served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Candidate keys for a controller source path, most specific first.
    pub fn keys_for(path: &Path) -> Vec<String> {
        let mut keys = vec![path.to_string_lossy().into_owned()];
        let component = path
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());
        if let Some(component) = component {
            keys.push(format!("{component}/{}", entity_name(path)));
        }
        keys
    }

    fn factory_for(&self, path: &Path) -> Option<Factory> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self::keys_for(path)
            .iter()
            .find_map(|key| factories.get(key).cloned())
    }
}

impl ModuleLoader for StaticLoader {
    async fn load(&self, path: &Path) -> Result<Module, LoadError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let factory = self
            .factory_for(path)
            .ok_or_else(|| LoadError::NotFound(path.to_path_buf()))?;
        factory().map_err(|err| LoadError::import(path, err))
    }
}

impl fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut keys: Vec<_> = factories.keys().collect();
        keys.sort();
        f.debug_struct("StaticLoader").field("keys", &keys).finish()
    }
}
