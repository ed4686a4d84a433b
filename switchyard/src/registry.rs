//! # Registry
//!
//! The registry owns every component and resolves request paths to
//! candidate handlers.
//!
//! # Path Resolution
//!
//! A path is split into at most three non-empty segments,
//! `/<component>/<controller>/<method>`, and then read as:
//!
//! | path            | component | controller | method    |
//! |-----------------|-----------|------------|-----------|
//! | `/`             | `index`   | `index`    | `default` |
//! | `/blog`         | `blog`    | `index`    | `default` |
//! | `/blog/list`    | `blog`    | `index`    | `list`    |
//! | `/blog/posts/7` | `blog`    | `posts`    | `7`       |
//!
//! Candidate controllers are tried in the order `(component, controller)`,
//! `(component, index)`, `(index, controller)`, `(index, index)`, skipping
//! missing ones and duplicates. Each surviving controller contributes the
//! requested method or, failing that, its `default` method. Paths that spell
//! a fallback name literally (`index` as first or second segment, `default`
//! as third) never match.

use crate::{
    bound::BoundHandler,
    component::Component,
    controller::{Controller, DEFAULT_METHOD},
    options::RouterOptions,
};
use futures::future::join_all;
use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};
use switchyard_core::{
    EventBus, Origin, ProcedureError, RouterEvent, SwitchyardError, entity_name,
};

/// Fallback component and controller name.
pub const INDEX: &str = "index";

/// Component → controller → sorted method names.
pub type Layout = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// The set of components.
pub struct Registry {
    bus: EventBus,
    options: Arc<RouterOptions>,
    components: RwLock<BTreeMap<String, Arc<Component>>>,
    initialized: AtomicBool,
}

impl Registry {
    /// Create an empty registry whose events propagate to `parent`.
    pub fn new(parent: &EventBus, options: Arc<RouterOptions>) -> Self {
        Self {
            bus: parent.child(),
            options,
            components: RwLock::new(BTreeMap::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Discover components under `roots` and load them all.
    ///
    /// A directory name found under several roots yields one component
    /// spanning all of them. Resolves once every component has settled.
    /// Emits `Ready` if every component became ready and `Failed` otherwise;
    /// components that failed are kept but never match.
    pub async fn load(&self, roots: &[PathBuf]) -> Result<(), SwitchyardError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(ProcedureError::InitCalledTwice("registry".into()).into());
        }

        let dirs = match self.options.discovery.component_dirs_dyn(roots).await {
            Ok(dirs) => dirs,
            Err(err) => {
                tracing::warn!(error = %err, "Component discovery failed");
                self.bus.emit(RouterEvent::Failed {
                    origin: Origin::Registry,
                    reason: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let mut grouped: Vec<(String, Vec<PathBuf>)> = Vec::new();
        for dir in dirs {
            let name = entity_name(&dir);
            match grouped.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, paths)) => paths.push(dir),
                None => grouped.push((name, vec![dir])),
            }
        }

        let created: Vec<Arc<Component>> = grouped
            .into_iter()
            .map(|(name, paths)| {
                let component = Component::new(name.clone(), paths, &self.bus, self.options.clone());
                self.insert(component.clone());
                component
            })
            .collect();

        tracing::debug!(components = created.len(), "Registry loaded");
        self.bus.emit(RouterEvent::Load(Origin::Registry));

        for result in join_all(created.iter().map(|component| component.init())).await {
            if let Err(err) = result {
                tracing::debug!(error = %err, "Component did not load");
            }
        }

        let failed: Vec<&str> = created
            .iter()
            .filter(|component| !component.is_ready())
            .map(|component| component.name())
            .collect();
        if failed.is_empty() {
            tracing::debug!("Registry ready");
            self.bus.emit(RouterEvent::Ready(Origin::Registry));
        } else {
            tracing::warn!(components = ?failed, "Some components failed to load and will not match");
            self.bus.emit(RouterEvent::Failed {
                origin: Origin::Registry,
                reason: format!("components not ready: {}", failed.join(", ")),
            });
        }
        Ok(())
    }

    fn insert(&self, component: Arc<Component>) -> Option<Arc<Component>> {
        self.components
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(component.name().to_owned(), component)
    }

    /// Add a component spanning `paths` at runtime and load it.
    ///
    /// A component with the same name is replaced once the new one is
    /// registered; requests in flight keep the handlers they resolved.
    pub async fn add(
        &self,
        name: impl Into<String>,
        paths: Vec<PathBuf>,
    ) -> Result<Arc<Component>, SwitchyardError> {
        let component = Component::new(name, paths, &self.bus, self.options.clone());
        if let Some(previous) = self.insert(component.clone()) {
            previous.bus().detach();
        }
        component.init().await?;
        Ok(component)
    }

    /// Remove a component, detaching it from the event tree.
    pub fn remove(&self, name: &str) -> Option<Arc<Component>> {
        let removed = self
            .components
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name)?;
        removed.bus().detach();
        Some(removed)
    }

    /// Look up a component.
    pub fn component(&self, name: &str) -> Option<Arc<Component>> {
        self.components
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// Look up a controller of a component.
    pub fn controller(&self, component: &str, controller: &str) -> Option<Arc<Controller>> {
        self.component(component)?.controller(controller)
    }

    /// Component names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.components
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether no component was discovered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The full component / controller / method layout.
    pub fn layout(&self) -> Layout {
        self.components
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(name, component)| {
                let controllers = component
                    .controllers()
                    .into_iter()
                    .map(|controller| (controller.name().to_owned(), controller.method_names()))
                    .collect();
                (name.clone(), controllers)
            })
            .collect()
    }

    /// A controller of a ready component.
    fn serving(&self, component: &str, controller: &str) -> Option<Arc<Controller>> {
        self.component(component)
            .filter(|component| component.is_ready())?
            .controller(controller)
    }

    /// Resolve a request path to its ordered candidate handlers.
    ///
    /// Never returns more than four handlers, at most one per controller.
    pub fn match_path(&self, path: &str) -> Vec<BoundHandler> {
        let Some(route) = Route::parse(path) else {
            return Vec::new();
        };

        let lookups = [
            (route.component, route.controller),
            (route.component, INDEX),
            (INDEX, route.controller),
            (INDEX, INDEX),
        ];
        let mut controllers: Vec<Arc<Controller>> = Vec::with_capacity(lookups.len());
        for (component, controller) in lookups {
            if let Some(found) = self.serving(component, controller) {
                if !controllers.iter().any(|seen| Arc::ptr_eq(seen, &found)) {
                    controllers.push(found);
                }
            }
        }

        controllers
            .iter()
            .filter_map(|controller| controller.method_or_default(route.method))
            .collect()
    }

    /// This registry's event node.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.names())
            .finish()
    }
}

/// A request path read as component, controller and method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    /// Component name.
    pub component: &'a str,
    /// Controller name.
    pub controller: &'a str,
    /// Method name.
    pub method: &'a str,
}

impl<'a> Route<'a> {
    /// Parse a request path. Returns `None` for paths that use a reserved
    /// fallback name literally.
    pub fn parse(path: &'a str) -> Option<Self> {
        let mut parts = path
            .split('/')
            .map(str::trim)
            .filter(|part| !part.is_empty());
        let (part1, part2, part3) = (parts.next(), parts.next(), parts.next());

        if part1 == Some(INDEX) || part2 == Some(INDEX) || part3 == Some(DEFAULT_METHOD) {
            return None;
        }

        Some(Route {
            component: part1.unwrap_or(INDEX),
            controller: part3.and(part2).unwrap_or(INDEX),
            method: part3.or(part2).unwrap_or(DEFAULT_METHOD),
        })
    }
}
