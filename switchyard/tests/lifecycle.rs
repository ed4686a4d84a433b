//! Router start-up: waiting for readiness, stalled and failed loads.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use switchyard::{
    DispatchError, EventKind, LifecycleState, Module, ProcedureError, RequestContext, Router,
    SwitchyardError,
    testing::{CountingHandler, MemoryDiscovery, PendingLoader, RecordingListener},
};
use tokio::time::timeout;

mod common;
use common::{ROOT, Tree};

const PATIENCE: Duration = Duration::from_millis(100);

fn counted(handler: &CountingHandler) -> Module {
    Module::new().with("list", handler.clone())
}

#[tokio::test]
async fn test_requests_wait_for_initial_load() {
    let handler = CountingHandler::new("done").completing();
    let router = Arc::new(
        Tree::new()
            .controller("blog", "index", counted(&handler))
            .builder()
            .build(),
    );

    let ctx = RequestContext::new("/blog/list");
    let pending = {
        let router = router.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { router.dispatch(&ctx).await })
    };
    router.start(vec![PathBuf::from(ROOT)]).await.unwrap().unwrap();

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(outcome.invoked, 1);
    assert!(outcome.completed);
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn test_stalled_import_blocks_readiness() {
    let tree = Tree::new()
        .controller("blog", "index", Module::new())
        .controller("blog", "slow", Module::new());
    let router = Arc::new(
        Router::builder()
            .with_discovery(tree.discovery)
            .with_loader(PendingLoader::new(tree.loader).hold("blog/slow"))
            .build(),
    );

    let _task = router.start(vec![PathBuf::from(ROOT)]);
    let ctx = RequestContext::new("/blog");
    assert!(timeout(PATIENCE, router.dispatch(&ctx)).await.is_err());
    assert!(!router.is_ready());

    let blog = router.registry().component("blog").unwrap();
    assert!(!blog.is_ready());
    assert_eq!(blog.pending(), vec!["slow".to_owned()]);
}

#[tokio::test]
async fn test_load_timeout_lets_router_open() {
    let handler = CountingHandler::new("");
    let tree = Tree::new()
        .controller("index", "index", Module::new().with("default", handler.clone()))
        .controller("blog", "index", Module::new())
        .controller("blog", "slow", Module::new());
    let router = Router::builder()
        .with_discovery(tree.discovery)
        .with_loader(PendingLoader::new(tree.loader).hold("blog/slow"))
        .with_load_timeout(Duration::from_millis(20))
        .build();

    router.init([ROOT]).await.unwrap();
    assert!(router.is_ready());

    let slow = router.registry().controller("blog", "slow").unwrap();
    assert!(matches!(slow.state(), LifecycleState::Failed(_)));
    assert!(!router.registry().component("blog").unwrap().is_ready());

    // The failed component never matches; the index fallback still does.
    let outcome = router.dispatch(&RequestContext::new("/blog/list")).await.unwrap();
    assert_eq!(outcome.invoked, 1);
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn test_init_twice_fails() {
    let router = Tree::new()
        .controller("blog", "index", Module::new())
        .router()
        .await;

    let err = router.init([ROOT]).await.unwrap_err();
    assert!(matches!(
        err,
        SwitchyardError::Procedure(ProcedureError::InitCalledTwice(_))
    ));
    assert!(router.is_ready());
}

#[tokio::test]
async fn test_discovery_failure_makes_router_unavailable() {
    let router = Router::builder()
        .with_discovery(MemoryDiscovery::new().with_failing_root(ROOT))
        .build();
    let recorder = RecordingListener::new();
    router.on(recorder.clone());

    let err = router.init([ROOT]).await.unwrap_err();
    assert!(matches!(err, SwitchyardError::Discovery(_)));
    assert!(matches!(router.state(), LifecycleState::Failed(_)));
    assert_eq!(recorder.count_kind(EventKind::Failed), 2);
    assert_eq!(recorder.count_kind(EventKind::Ready), 0);

    let err = router.dispatch(&RequestContext::new("/")).await.unwrap_err();
    assert!(matches!(err, DispatchError::Unavailable(_)));

    let next_calls = AtomicUsize::new(0);
    let result = router
        .middleware(&RequestContext::new("/"), || {
            next_calls.fetch_add(1, Ordering::SeqCst);
            async {}
        })
        .await;
    assert!(result.is_err());
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_mark_ready_is_idempotent() {
    let router = Tree::new()
        .controller("blog", "index", Module::new())
        .builder()
        .build();
    let recorder = RecordingListener::new();
    router.on(recorder.clone());
    router.init([ROOT]).await.unwrap();

    let ready_events = recorder.count_kind(EventKind::Ready);
    let controller = router.registry().controller("blog", "index").unwrap();
    assert!(!controller.mark_ready());
    assert!(!controller.mark_ready());
    assert_eq!(recorder.count_kind(EventKind::Ready), ready_events);
}

#[tokio::test]
async fn test_empty_tree_is_ready() {
    let router = Tree::new().router().await;
    assert!(router.is_ready());
    assert!(router.registry().is_empty());

    let outcome = router.dispatch(&RequestContext::new("/anything")).await.unwrap();
    assert_eq!(outcome.invoked, 0);
}
