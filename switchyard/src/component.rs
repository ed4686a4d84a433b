//! # Component
//!
//! A component is a route namespace backed by one or more directories. Its
//! readiness is a barrier over its controllers: it becomes ready exactly
//! once, after every controller it owns has become ready.
//!
//! The component learns about its controllers' progress only through the
//! event bus. It listens on its own node, which every controller node
//! forwards to, and holds its controllers strongly while they never hold
//! the component.

use crate::{
    controller::Controller,
    lifecycle::{Lifecycle, LifecycleState, ReadinessBarrier},
    options::RouterOptions,
};
use futures::future::join_all;
use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    sync::{
        Arc, RwLock, Weak,
        atomic::{AtomicBool, Ordering},
    },
};
use switchyard_core::{
    ComponentId, ControllerId, EventBus, Origin, ProcedureError, RouterEvent, SwitchyardError,
    entity_name,
};

/// A named set of controllers.
pub struct Component {
    id: ComponentId,
    paths: Vec<PathBuf>,
    bus: EventBus,
    options: Arc<RouterOptions>,
    controllers: RwLock<BTreeMap<String, Arc<Controller>>>,
    barrier: ReadinessBarrier,
    initialized: AtomicBool,
    lifecycle: Lifecycle,
}

impl Component {
    /// Create a component spanning `paths`, whose events propagate to
    /// `parent`.
    ///
    /// Controllers are enumerated by [`init`](Self::init).
    pub fn new(
        name: impl Into<String>,
        paths: Vec<PathBuf>,
        parent: &EventBus,
        options: Arc<RouterOptions>,
    ) -> Arc<Self> {
        let id = ComponentId {
            name: name.into(),
            path: paths.first().cloned().unwrap_or_default(),
        };
        let bus = parent.child();

        Arc::new_cyclic(|weak: &Weak<Component>| {
            let weak = weak.clone();
            bus.on(move |event: &RouterEvent| {
                if let Some(component) = weak.upgrade() {
                    component.observe(event);
                }
            });
            Self {
                id,
                paths,
                bus,
                options,
                controllers: RwLock::new(BTreeMap::new()),
                barrier: ReadinessBarrier::new(),
                initialized: AtomicBool::new(false),
                lifecycle: Lifecycle::new(),
            }
        })
    }

    fn observe(&self, event: &RouterEvent) {
        match event {
            RouterEvent::Ready(Origin::Controller(id)) if self.owns(id) => {
                if self.barrier.complete(&id.name) {
                    self.become_ready();
                }
            }
            RouterEvent::Failed {
                origin: Origin::Controller(id),
                reason,
            } if self.owns(id) && !self.barrier.is_fired() => {
                let reason = format!("controller {} failed: {reason}", id.name);
                self.lifecycle.set(LifecycleState::Failed(reason.clone()));
                tracing::warn!(component = %self.id, %reason, "Component will not become ready");
                self.bus.emit(RouterEvent::Failed {
                    origin: self.origin(),
                    reason,
                });
            }
            _ => {}
        }
    }

    fn owns(&self, id: &ControllerId) -> bool {
        id.component == self.id.name
            && self
                .controllers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .get(&id.name)
                .is_some_and(|controller| controller.path() == id.path)
    }

    fn become_ready(&self) {
        self.lifecycle.set(LifecycleState::Ready);
        tracing::debug!(component = %self.id, "Component ready");
        self.bus.emit(RouterEvent::Ready(self.origin()));
    }

    /// Enumerate controllers and load them all.
    ///
    /// Resolves once every controller has finished loading or failed. Fails
    /// with [`ProcedureError::InitCalledTwice`] on a second call, or with the
    /// discovery error if the controllers could not be enumerated.
    pub async fn init(self: &Arc<Self>) -> Result<(), SwitchyardError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(ProcedureError::InitCalledTwice(format!("component {}", self.id)).into());
        }
        self.lifecycle.set(LifecycleState::Loading);

        let mut files = Vec::new();
        for path in &self.paths {
            match self.options.discovery.controller_files_dyn(path).await {
                Ok(found) => files.extend(found),
                Err(err) => {
                    self.lifecycle.set(LifecycleState::Failed(err.to_string()));
                    tracing::warn!(component = %self.id, error = %err, "Controller enumeration failed");
                    self.bus.emit(RouterEvent::Failed {
                        origin: self.origin(),
                        reason: err.to_string(),
                    });
                    return Err(err.into());
                }
            }
        }

        let created: Vec<Arc<Controller>> = {
            let mut controllers = self
                .controllers
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            files
                .into_iter()
                .filter_map(|file| {
                    let name = entity_name(&file);
                    if controllers.contains_key(&name) {
                        tracing::debug!(component = %self.id, controller = %name, path = %file.display(), "Skipping shadowed controller");
                        return None;
                    }
                    let controller = self.create(name.clone(), file);
                    self.barrier.expect(name.clone());
                    controllers.insert(name, controller.clone());
                    Some(controller)
                })
                .collect()
        };

        self.lifecycle.set(LifecycleState::Loaded);
        tracing::debug!(component = %self.id, controllers = created.len(), "Component loaded");
        self.bus.emit(RouterEvent::Load(self.origin()));
        if self.barrier.arm() {
            self.become_ready();
        }

        for result in join_all(created.iter().map(|controller| controller.init())).await {
            if let Err(err) = result {
                tracing::debug!(component = %self.id, error = %err, "Controller did not load");
            }
        }
        Ok(())
    }

    fn create(&self, name: String, path: PathBuf) -> Arc<Controller> {
        let id = ControllerId {
            component: self.id.name.clone(),
            name,
            path,
        };
        Controller::new(id, &self.bus, self.options.clone())
    }

    /// Add a controller at runtime and load it.
    ///
    /// A controller with the same name is replaced. If the component is not
    /// ready yet, it also waits for the new controller.
    pub async fn add_controller(
        self: &Arc<Self>,
        path: impl Into<PathBuf>,
    ) -> Result<Arc<Controller>, SwitchyardError> {
        let path = path.into();
        let name = entity_name(&path);
        self.remove_controller(&name);

        let controller = self.create(name.clone(), path);
        self.barrier.expect(name.clone());
        self.controllers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name, controller.clone());

        controller.init().await?;
        Ok(controller)
    }

    /// Remove a controller, detaching it from the event tree.
    ///
    /// If the component was only waiting on that controller, it becomes
    /// ready.
    pub fn remove_controller(&self, name: &str) -> Option<Arc<Controller>> {
        let removed = self
            .controllers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name)?;
        removed.bus().detach();
        if self.barrier.forget(name) {
            self.become_ready();
        }
        Some(removed)
    }

    /// Look up a controller.
    pub fn controller(&self, name: &str) -> Option<Arc<Controller>> {
        self.controllers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// All controllers, sorted by name.
    pub fn controllers(&self) -> Vec<Arc<Controller>> {
        self.controllers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Controller names, sorted.
    pub fn controller_names(&self) -> Vec<String> {
        self.controllers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Controllers the component is still waiting for.
    pub fn pending(&self) -> Vec<String> {
        self.barrier.pending()
    }

    /// Identity.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Directories the component spans.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether the readiness barrier has fired.
    pub fn is_ready(&self) -> bool {
        self.barrier.is_fired()
    }

    /// Wait until loading has settled and return the final state.
    pub async fn settled(&self) -> LifecycleState {
        self.lifecycle.wait_for(LifecycleState::is_settled).await
    }

    /// This component's event node.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn origin(&self) -> Origin {
        Origin::Component(self.id.clone())
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("controllers", &self.controller_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RouterBuilder;
    use switchyard_core::{Args, EventKind, Module, sync_handler_fn};
    use switchyard_std::{
        StaticLoader,
        testing::{MemoryDiscovery, PendingLoader, RecordingListener},
    };

    fn list() -> Module {
        Module::new().with("list", sync_handler_fn("", |_: Args| ()))
    }

    fn component(
        discovery: MemoryDiscovery,
        builder: RouterBuilder,
    ) -> (Arc<Component>, RecordingListener, EventBus) {
        let root = EventBus::new();
        let recorder = RecordingListener::new();
        root.on(recorder.clone());
        let options = Arc::new(builder.with_discovery(discovery).into_options());
        let component = Component::new("blog", vec![PathBuf::from("/app/blog")], &root, options);
        (component, recorder, root)
    }

    #[tokio::test]
    async fn test_ready_after_every_controller() {
        let discovery = MemoryDiscovery::new()
            .with_controller("/app", "blog", "index")
            .with_controller("/app", "blog", "posts");
        let loader = StaticLoader::new().with("blog/index", list).with("blog/posts", list);
        let (component, recorder, _root) = component(discovery, RouterBuilder::new().with_loader(loader));

        component.init().await.unwrap();

        assert!(component.is_ready());
        assert_eq!(component.state(), LifecycleState::Ready);
        assert_eq!(component.controller_names(), vec!["index", "posts"]);

        let ready = recorder.origins(EventKind::Ready);
        assert_eq!(ready.len(), 3);
        assert!(matches!(ready.last(), Some(Origin::Component(id)) if id.name == "blog"));
    }

    #[tokio::test]
    async fn test_stalled_controller_blocks_readiness() {
        let discovery = MemoryDiscovery::new()
            .with_controller("/app", "blog", "index")
            .with_controller("/app", "blog", "stalled");
        let loader = PendingLoader::new(StaticLoader::new().with("blog/index", list)).hold("blog/stalled");
        let (component, _, _root) = component(discovery, RouterBuilder::new().with_loader(loader));

        let init = component.clone();
        let task = tokio::spawn(async move { init.init().await });
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        assert!(!component.is_ready());
        assert_eq!(component.pending(), vec!["stalled"]);
        assert!(component.controller("index").is_some_and(|c| c.is_ready()));
        task.abort();
    }

    #[tokio::test]
    async fn test_failed_controller_fails_component() {
        let discovery = MemoryDiscovery::new()
            .with_controller("/app", "blog", "index")
            .with_controller("/app", "blog", "broken");
        let loader = StaticLoader::new().with("blog/index", list);
        let (component, recorder, _root) = component(discovery, RouterBuilder::new().with_loader(loader));

        component.init().await.unwrap();

        assert!(!component.is_ready());
        assert!(matches!(component.state(), LifecycleState::Failed(_)));
        assert!(recorder
            .origins(EventKind::Failed)
            .iter()
            .any(|origin| matches!(origin, Origin::Component(_))));
    }

    #[tokio::test]
    async fn test_zero_controllers_ready_after_enumeration() {
        let discovery = MemoryDiscovery::new().with_component("/app", "blog");
        let (component, recorder, _root) = component(discovery, RouterBuilder::new());

        component.init().await.unwrap();
        assert!(component.is_ready());
        assert_eq!(recorder.count_kind(EventKind::Ready), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ready_does_not_double_fire() {
        let discovery = MemoryDiscovery::new().with_controller("/app", "blog", "index");
        let loader = StaticLoader::new().with("blog/index", list);
        let (component, recorder, _root) = component(discovery, RouterBuilder::new().with_loader(loader));
        component.init().await.unwrap();

        let controller = component.controller("index").unwrap();
        controller
            .bus()
            .emit(RouterEvent::Ready(Origin::Controller(controller.id().clone())));

        let component_ready = recorder
            .origins(EventKind::Ready)
            .into_iter()
            .filter(|origin| matches!(origin, Origin::Component(_)))
            .count();
        assert_eq!(component_ready, 1);
    }

    #[tokio::test]
    async fn test_init_twice() {
        let (component, _, _root) = component(MemoryDiscovery::new(), RouterBuilder::new());
        component.init().await.unwrap();
        assert!(matches!(
            component.init().await,
            Err(SwitchyardError::Procedure(ProcedureError::InitCalledTwice(_)))
        ));
    }

    #[tokio::test]
    async fn test_remove_stalled_controller_releases_barrier() {
        let discovery = MemoryDiscovery::new()
            .with_controller("/app", "blog", "index")
            .with_controller("/app", "blog", "stalled");
        let loader = PendingLoader::new(StaticLoader::new().with("blog/index", list)).hold("blog/stalled");
        let (component, _, _root) = component(discovery, RouterBuilder::new().with_loader(loader));

        let init = component.clone();
        let task = tokio::spawn(async move { init.init().await });
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert!(!component.is_ready());

        assert!(component.remove_controller("stalled").is_some());
        assert!(component.is_ready());
        task.abort();
    }

    #[tokio::test]
    async fn test_add_controller_at_runtime() {
        let discovery = MemoryDiscovery::new().with_controller("/app", "blog", "index");
        let loader = StaticLoader::new().with("blog/index", list).with("blog/extra", list);
        let (component, _, _root) = component(discovery, RouterBuilder::new().with_loader(loader));
        component.init().await.unwrap();

        let added = component
            .add_controller(MemoryDiscovery::controller_path("/app", "blog", "extra"))
            .await
            .unwrap();
        assert!(added.is_ready());
        assert_eq!(component.controller_names(), vec!["extra", "index"]);
    }
}
