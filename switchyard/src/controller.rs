//! # Controller
//!
//! A controller owns the method table of one loaded module.
//!
//! # Lifecycle
//!
//! ```text
//! Unloaded --init--> Loading --import ok--> Loaded --> Ready
//!                       |                                |
//!                       +--import err--> Failed          +--reload--> Loading
//! ```
//!
//! The method table is an immutable snapshot behind a lock. Loading builds a
//! complete new table and swaps it in with a single write, tagged with the
//! generation that produced it; a load superseded by a newer one discards
//! its result. Dispatches clone the handlers they need out of the snapshot,
//! so a swap never tears a request in flight.

use crate::{
    bound::BoundHandler,
    lifecycle::{Lifecycle, LifecycleState},
    options::RouterOptions,
};
use std::{
    collections::BTreeMap,
    fmt,
    path::Path,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use switchyard_core::{
    ControllerId, EventBus, LoadError, Module, Origin, ProcedureError, Reloadable, RouterEvent,
    SwitchyardError,
};
use switchyard_std::ReloadWatcher;

/// Name of the method used when the requested one is not exported.
pub const DEFAULT_METHOD: &str = "default";

/// Immutable snapshot of a controller's exports.
#[derive(Debug)]
pub struct MethodTable {
    generation: u64,
    methods: BTreeMap<String, BoundHandler>,
}

impl MethodTable {
    /// Generation of the load that produced this table.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Look up a method.
    pub fn get(&self, name: &str) -> Option<&BoundHandler> {
        self.methods.get(name)
    }

    /// Method names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Number of methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the module exported nothing.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// A named set of handler methods backed by one module.
pub struct Controller {
    id: ControllerId,
    bus: EventBus,
    options: Arc<RouterOptions>,
    initialized: AtomicBool,
    loaded: AtomicBool,
    ready: AtomicBool,
    generation: AtomicU64,
    table: RwLock<Option<Arc<MethodTable>>>,
    lifecycle: Lifecycle,
    watcher: Mutex<Option<ReloadWatcher>>,
}

impl Controller {
    /// Create a controller whose events propagate to `parent`.
    ///
    /// Nothing is loaded until [`init`](Self::init).
    pub fn new(id: ControllerId, parent: &EventBus, options: Arc<RouterOptions>) -> Arc<Self> {
        Arc::new(Self {
            id,
            bus: parent.child(),
            options,
            initialized: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            table: RwLock::new(None),
            lifecycle: Lifecycle::new(),
            watcher: Mutex::new(None),
        })
    }

    /// Load the module for the first time.
    ///
    /// Fails with [`ProcedureError::InitCalledTwice`] on a second call. A
    /// failed import leaves the controller [`Failed`](LifecycleState::Failed)
    /// and is also reported through a `Failed` event.
    pub async fn init(self: &Arc<Self>) -> Result<(), SwitchyardError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(ProcedureError::InitCalledTwice(format!("controller {}", self.id)).into());
        }

        if let Some(interval) = self.options.watch_interval {
            let watcher = ReloadWatcher::spawn(self, interval);
            *self
                .watcher
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(watcher);
        }

        self.load().await?;
        Ok(())
    }

    /// Re-import the module and swap in the new method table.
    ///
    /// On failure the table is cleared: the controller stops matching rather
    /// than serving handlers from a module that no longer loads.
    pub async fn reload(&self) -> Result<(), LoadError> {
        self.loaded.store(false, Ordering::Release);
        self.ready.store(false, Ordering::Release);
        self.load().await
    }

    async fn load(&self) -> Result<(), LoadError> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.lifecycle.set(LifecycleState::Loading);
        tracing::debug!(controller = %self.id, generation, "Loading controller");

        let path = self.id.path.as_path();
        let import = self.options.loader.load_dyn(path);
        let result = match self.options.load_timeout {
            Some(limit) => tokio::time::timeout(limit, import)
                .await
                .unwrap_or_else(|_| Err(LoadError::Timeout(path.to_path_buf(), limit))),
            None => import.await,
        };

        match result {
            Ok(module) => {
                let table = Arc::new(self.wrap(&module, generation));
                if !self.install(Some(table), generation) {
                    tracing::debug!(controller = %self.id, generation, "Discarding superseded load");
                    return Ok(());
                }
                self.loaded.store(true, Ordering::Release);
                self.lifecycle.set(LifecycleState::Loaded);
                tracing::debug!(controller = %self.id, methods = module.len(), "Controller loaded");
                self.bus.emit(RouterEvent::Load(self.origin()));
                self.mark_ready();
                Ok(())
            }
            Err(err) => {
                if self.install(None, generation) {
                    self.lifecycle.set(LifecycleState::Failed(err.to_string()));
                    tracing::warn!(controller = %self.id, error = %err, "Controller failed to load");
                    self.bus.emit(RouterEvent::Failed {
                        origin: self.origin(),
                        reason: err.to_string(),
                    });
                }
                Err(err)
            }
        }
    }

    /// Replace the table if `generation` is still the latest load.
    fn install(&self, table: Option<Arc<MethodTable>>, generation: u64) -> bool {
        let mut slot = self
            .table
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        *slot = table;
        true
    }

    fn wrap(&self, module: &Module, generation: u64) -> MethodTable {
        let methods = module
            .iter()
            .map(|(name, handler)| {
                let params = self
                    .options
                    .params
                    .get_or_parse(handler.handler_id(), handler.descriptor_dyn());
                let bound = BoundHandler::new(
                    name,
                    self.id.clone(),
                    handler.clone(),
                    params,
                    self.bus.clone(),
                );
                (name.to_owned(), bound)
            })
            .collect();
        MethodTable {
            generation,
            methods,
        }
    }

    /// Complete the `Loaded → Ready` transition.
    ///
    /// Returns `true` only for the call that made the controller ready; it is
    /// a no-op before loading finished or once already ready.
    pub fn mark_ready(&self) -> bool {
        if !self.loaded.load(Ordering::Acquire) {
            return false;
        }
        if self.ready.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.lifecycle.set(LifecycleState::Ready);
        tracing::debug!(controller = %self.id, "Controller ready");
        self.bus.emit(RouterEvent::Ready(self.origin()));
        true
    }

    /// Resolve a method, without falling back to [`DEFAULT_METHOD`].
    pub fn method(&self, name: &str) -> Option<BoundHandler> {
        self.table().and_then(|table| table.get(name).cloned())
    }

    /// Resolve `name`, falling back to [`DEFAULT_METHOD`].
    pub fn method_or_default(&self, name: &str) -> Option<BoundHandler> {
        let table = self.table()?;
        table
            .get(name)
            .or_else(|| table.get(DEFAULT_METHOD))
            .cloned()
    }

    /// The current method table snapshot.
    pub fn table(&self) -> Option<Arc<MethodTable>> {
        self.table
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Current method names, sorted.
    pub fn method_names(&self) -> Vec<String> {
        self.table()
            .map(|table| table.names().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Identity.
    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    /// Controller name.
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        &self.id.path
    }

    /// Owning component name.
    pub fn component(&self) -> &str {
        &self.id.component
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether the module has been imported and wrapped.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Whether the controller is ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Number of loads started so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Wait until loading has settled and return the final state.
    pub async fn settled(&self) -> LifecycleState {
        self.lifecycle.wait_for(LifecycleState::is_settled).await
    }

    /// This controller's event node.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn origin(&self) -> Origin {
        Origin::Controller(self.id.clone())
    }
}

impl Reloadable for Controller {
    fn source(&self) -> &Path {
        &self.id.path
    }

    fn reload(&self) -> impl std::future::Future<Output = Result<(), LoadError>> + Send {
        Controller::reload(self)
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("generation", &self.generation())
            .field("methods", &self.method_names())
            .finish()
    }
}
