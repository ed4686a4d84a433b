//! Testing utilities for Switchyard.
//!
//! # Features
//!
//! - [`RecordingListener`]: A listener that records all events it receives
//! - [`CountingHandler`]: A handler that counts invocations and can be told
//!   to signal completion or fail
//! - [`MemoryDiscovery`]: An in-memory component tree
//! - [`FailingLoader`]: A loader whose imports always fail
//! - [`PendingLoader`]: A loader that never finishes importing selected modules

use crate::loader::StaticLoader;
use std::{
    collections::{BTreeMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use switchyard_core::{
    Arg, Args, BoxError, Discovery, DiscoveryError, EventKind, EventListener, Handler, LoadError,
    Module, ModuleLoader, Origin, RouterEvent,
};

// ============================================================================
// Recording Listener
// ============================================================================

/// A listener that records all events it receives.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingListener::new();
/// router.on(recorder.clone());
/// router.init(roots).await?;
/// assert_eq!(recorder.count_kind(EventKind::Ready), 3);
/// ```
#[derive(Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<RouterEvent>>>,
}

impl RecordingListener {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<RouterEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Number of recorded events of one kind.
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    /// Origins of recorded events of one kind, in order.
    pub fn origins(&self, kind: EventKind) -> Vec<Origin> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.kind() == kind)
            .map(RouterEvent::origin)
            .collect()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &RouterEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Behavior {
    Continue,
    Complete,
    Fail,
}

/// A handler that counts its invocations.
///
/// Clones share the counter, so a test can keep one clone while exporting
/// another. By default the handler returns without signaling completion.
#[derive(Clone)]
pub struct CountingHandler {
    descriptor: String,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Args>>>,
    behavior: Behavior,
}

impl CountingHandler {
    /// A handler declaring the given descriptor.
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            behavior: Behavior::Continue,
        }
    }

    /// Signal every bound completion callback when invoked.
    ///
    /// The descriptor should declare `done`.
    pub fn completing(mut self) -> Self {
        self.behavior = Behavior::Complete;
        self
    }

    /// Return an error when invoked.
    pub fn failing(mut self) -> Self {
        self.behavior = Behavior::Fail;
        self
    }

    /// Number of invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Arguments received by each invocation, in order.
    pub fn received(&self) -> Vec<Args> {
        self.seen.lock().unwrap().clone()
    }
}

impl Handler for CountingHandler {
    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    async fn call(&self, args: Args) -> Result<(), BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(args.clone());
        match self.behavior {
            Behavior::Continue => Ok(()),
            Behavior::Complete => {
                for arg in args.iter() {
                    if let Arg::Done(done) = arg {
                        done.signal();
                    }
                }
                Ok(())
            }
            Behavior::Fail => Err(io::Error::other("handler failed").into()),
        }
    }
}

// ============================================================================
// Memory Discovery
// ============================================================================

/// An in-memory component tree.
///
/// Paths follow the filesystem layout: component `c` under root `r` lives at
/// `r/c`, and its controller `x` at `r/c/controllers/x.rs`, so the keys a
/// [`StaticLoader`] derives from them are `"c/x"`.
#[derive(Debug, Default, Clone)]
pub struct MemoryDiscovery {
    roots: BTreeMap<PathBuf, BTreeMap<String, Vec<String>>>,
    failing: HashSet<PathBuf>,
}

impl MemoryDiscovery {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component without controllers.
    pub fn with_component(mut self, root: impl Into<PathBuf>, component: &str) -> Self {
        self.roots
            .entry(root.into())
            .or_default()
            .entry(component.to_owned())
            .or_default();
        self
    }

    /// Add a controller, creating its component as needed.
    pub fn with_controller(
        mut self,
        root: impl Into<PathBuf>,
        component: &str,
        controller: &str,
    ) -> Self {
        let controllers = self
            .roots
            .entry(root.into())
            .or_default()
            .entry(component.to_owned())
            .or_default();
        if !controllers.iter().any(|existing| existing == controller) {
            controllers.push(controller.to_owned());
            controllers.sort();
        }
        self
    }

    /// Make enumeration of `root` fail.
    pub fn with_failing_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.failing.insert(root.into());
        self
    }

    /// Path of a controller in this tree.
    pub fn controller_path(root: impl AsRef<Path>, component: &str, controller: &str) -> PathBuf {
        root.as_ref()
            .join(component)
            .join("controllers")
            .join(format!("{controller}.rs"))
    }
}

impl Discovery for MemoryDiscovery {
    async fn component_dirs(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>, DiscoveryError> {
        let mut dirs = Vec::new();
        for root in roots {
            if self.failing.contains(root) {
                return Err(DiscoveryError::Io {
                    path: root.clone(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "unreadable root"),
                });
            }
            for component in self.roots.get(root).into_iter().flat_map(BTreeMap::keys) {
                let dir = root.join(component);
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        Ok(dirs)
    }

    async fn controller_files(&self, component: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        let (Some(root), Some(name)) = (component.parent(), component.file_name()) else {
            return Ok(Vec::new());
        };
        let name = name.to_string_lossy();
        Ok(self
            .roots
            .get(root)
            .and_then(|components| components.get(name.as_ref()))
            .into_iter()
            .flatten()
            .map(|controller| Self::controller_path(root, &name, controller))
            .collect())
    }
}

// ============================================================================
// Failing / Pending Loaders
// ============================================================================

/// A loader whose every import fails.
#[derive(Debug, Clone)]
pub struct FailingLoader {
    reason: String,
}

impl FailingLoader {
    /// Fail with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ModuleLoader for FailingLoader {
    async fn load(&self, path: &Path) -> Result<Module, LoadError> {
        Err(LoadError::import(path, &self.reason))
    }
}

/// A loader that never finishes importing selected modules and delegates the
/// rest to a [`StaticLoader`].
pub struct PendingLoader {
    inner: StaticLoader,
    held: HashSet<String>,
}

impl PendingLoader {
    /// Wrap a loader.
    pub fn new(inner: StaticLoader) -> Self {
        Self {
            inner,
            held: HashSet::new(),
        }
    }

    /// Never resolve imports for `key` (see [`StaticLoader::keys_for`]).
    pub fn hold(mut self, key: impl Into<String>) -> Self {
        self.held.insert(key.into());
        self
    }
}

impl ModuleLoader for PendingLoader {
    async fn load(&self, path: &Path) -> Result<Module, LoadError> {
        let held = StaticLoader::keys_for(path)
            .iter()
            .any(|key| self.held.contains(key));
        if held {
            futures::future::pending::<()>().await;
        }
        self.inner.load(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{Done, DynHandler};

    #[tokio::test]
    async fn test_memory_discovery_layout() {
        let discovery = MemoryDiscovery::new()
            .with_controller("/app", "blog", "posts")
            .with_controller("/app", "blog", "index")
            .with_component("/app", "empty")
            .with_controller("/other", "ignored", "index");

        let dirs = discovery
            .component_dirs(&[PathBuf::from("/app")])
            .await
            .unwrap();
        assert_eq!(dirs, vec![PathBuf::from("/app/blog"), PathBuf::from("/app/empty")]);

        let files = discovery.controller_files(Path::new("/app/blog")).await.unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/app/blog/controllers/index.rs"),
                PathBuf::from("/app/blog/controllers/posts.rs"),
            ]
        );
        assert!(discovery
            .controller_files(Path::new("/app/empty"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_counting_handler_completes() {
        let handler = CountingHandler::new("done").completing();
        let probe = handler.clone();
        let done = Done::new();

        handler
            .call_dyn(Args::new(vec![Arg::Done(done.clone())]))
            .await
            .unwrap();
        assert_eq!(probe.calls(), 1);
        assert!(done.is_signaled());
    }

    #[tokio::test]
    async fn test_failing_loader() {
        let err = FailingLoader::new("boom")
            .load(Path::new("/app/x/controllers/y.rs"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Import { .. }));
    }
}
