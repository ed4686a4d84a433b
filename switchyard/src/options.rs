//! Router configuration.

use crate::router::Router;
use std::{fmt, sync::Arc, time::Duration};
use switchyard_core::{
    Discovery, DynDiscovery, DynModuleLoader, Injectors, ModuleLoader, ParamCache, Value,
};
use switchyard_std::{FsDiscovery, StaticLoader};

/// Shared configuration handed to every registry, component and controller.
pub struct RouterOptions {
    pub(crate) discovery: Arc<dyn DynDiscovery>,
    pub(crate) loader: Arc<dyn DynModuleLoader>,
    pub(crate) injectors: Injectors,
    pub(crate) load_timeout: Option<Duration>,
    pub(crate) watch_interval: Option<Duration>,
    pub(crate) params: Arc<ParamCache>,
}

impl RouterOptions {
    /// The injector table bound into every dispatch.
    pub fn injectors(&self) -> &Injectors {
        &self.injectors
    }

    /// Deadline for a single module import.
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout
    }

    /// Poll interval of the hot-reload watcher, if enabled.
    pub fn watch_interval(&self) -> Option<Duration> {
        self.watch_interval
    }

    /// Descriptor cache shared by every controller.
    pub fn params(&self) -> &ParamCache {
        &self.params
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            discovery: Arc::new(FsDiscovery::new()),
            loader: Arc::new(StaticLoader::new()),
            injectors: Injectors::new(),
            load_timeout: None,
            watch_interval: None,
            params: Arc::new(ParamCache::new()),
        }
    }
}

impl fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOptions")
            .field("injectors", &self.injectors)
            .field("load_timeout", &self.load_timeout)
            .field("watch_interval", &self.watch_interval)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Router`].
///
/// # Example
/// ```ignore
/// let router = RouterBuilder::new()
///     .with_loader(loader)
///     .inject_value("site", "example.org")
///     .with_load_timeout(Duration::from_secs(5))
///     .build();
/// router.init(["./components"]).await?;
/// ```
#[derive(Default)]
pub struct RouterBuilder {
    options: RouterOptions,
}

impl RouterBuilder {
    /// Start from the defaults: filesystem discovery and an empty
    /// [`StaticLoader`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different discovery strategy.
    pub fn with_discovery<D: Discovery>(mut self, discovery: D) -> Self {
        self.options.discovery = Arc::new(discovery);
        self
    }

    /// Use a different module loader.
    pub fn with_loader<L: ModuleLoader>(mut self, loader: L) -> Self {
        self.options.loader = Arc::new(loader);
        self
    }

    /// Replace the injector table.
    pub fn with_injectors(mut self, injectors: Injectors) -> Self {
        self.options.injectors = injectors;
        self
    }

    /// Inject a plain value under `name`.
    pub fn inject_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.injectors.insert_value(name, value);
        self
    }

    /// Inject a factory invoked on every binding of `name`.
    pub fn inject_factory<F, V>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.options.injectors.insert_factory(name, factory);
        self
    }

    /// Fail imports that take longer than `timeout`.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.options.load_timeout = Some(timeout);
        self
    }

    /// Reload controllers whose source changes, polling every `interval`.
    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.options.watch_interval = Some(interval);
        self
    }

    /// Share a descriptor cache across routers.
    pub fn with_param_cache(mut self, cache: Arc<ParamCache>) -> Self {
        self.options.params = cache;
        self
    }

    /// Finish configuration.
    pub fn build(self) -> Router {
        Router::with_options(self.options)
    }

    /// Finish configuration without creating a router.
    pub fn into_options(self) -> RouterOptions {
        self.options
    }
}
