#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use switchyard::{
    Args, BoxError, Done, Handler, Module, RequestContext, Router, RouterBuilder, StaticLoader,
    handler_fn, testing::MemoryDiscovery,
};

pub const ROOT: &str = "/app";

// ============================================================================
// Call Trace
// ============================================================================

/// Shared, ordered record of which handlers ran.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, label: &str) {
        self.0.lock().unwrap().push(label.to_owned());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A handler that records `label` and optionally signals completion.
pub fn traced(trace: &Trace, label: &str, complete: bool) -> impl Handler {
    let trace = trace.clone();
    let label = label.to_owned();
    handler_fn("done", move |mut args: Args| {
        let trace = trace.clone();
        let label = label.clone();
        async move {
            let done: Done = args.extract(0)?;
            trace.push(&label);
            if complete {
                done.signal();
            }
            Ok::<_, BoxError>(())
        }
    })
}

/// A handler that records `label` and marks the response as sent.
pub fn sending(trace: &Trace, label: &str) -> impl Handler {
    let trace = trace.clone();
    let label = label.to_owned();
    handler_fn("ctx", move |mut args: Args| {
        let trace = trace.clone();
        let label = label.clone();
        async move {
            let ctx: RequestContext = args.extract(0)?;
            trace.push(&label);
            ctx.mark_sent();
            Ok::<_, BoxError>(())
        }
    })
}

/// A handler that records `label` and fails.
pub fn failing(trace: &Trace, label: &str) -> impl Handler {
    let trace = trace.clone();
    let label = label.to_owned();
    handler_fn("", move |_args: Args| {
        let trace = trace.clone();
        let label = label.clone();
        async move {
            trace.push(&label);
            Err::<(), BoxError>(format!("{label} exploded").into())
        }
    })
}

// ============================================================================
// Component Trees
// ============================================================================

/// An in-memory component tree with its modules.
#[derive(Default)]
pub struct Tree {
    pub discovery: MemoryDiscovery,
    pub loader: StaticLoader,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add controller `component/controller` exporting `module`.
    pub fn controller(mut self, component: &str, controller: &str, module: Module) -> Self {
        self.discovery = std::mem::take(&mut self.discovery).with_controller(ROOT, component, controller);
        self.loader
            .register(format!("{component}/{controller}"), move || module.clone());
        self
    }

    /// Add controller `component/controller` with no registered module.
    pub fn broken(mut self, component: &str, controller: &str) -> Self {
        self.discovery = std::mem::take(&mut self.discovery).with_controller(ROOT, component, controller);
        self
    }

    pub fn builder(self) -> RouterBuilder {
        Router::builder()
            .with_discovery(self.discovery)
            .with_loader(self.loader)
    }

    /// Build and initialize a router over this tree.
    pub async fn router(self) -> Router {
        let router = self.builder().build();
        router.init([ROOT]).await.unwrap();
        router
    }
}

/// Label of a candidate: `component/controller.method`.
pub fn label(handler: &switchyard::BoundHandler) -> String {
    let id = handler.controller();
    format!("{}/{}.{}", id.component, id.name, handler.method())
}
