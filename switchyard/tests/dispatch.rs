//! Candidate execution: ordering, completion, sent responses and errors.

use std::sync::atomic::{AtomicUsize, Ordering};
use switchyard::{DispatchError, Module, RequestContext, module};

mod common;
use common::{Trace, Tree, failing, sending, traced};

#[tokio::test]
async fn test_second_candidate_completes() {
    let trace = Trace::new();
    let router = Tree::new()
        .controller("blog", "posts", module! { "list" => traced(&trace, "posts", false) })
        .controller("blog", "index", module! { "default" => traced(&trace, "blog", true) })
        .controller("index", "index", module! { "default" => traced(&trace, "root", false) })
        .router()
        .await;

    let next_calls = AtomicUsize::new(0);
    let ctx = RequestContext::new("/blog/posts/list");
    let result = router
        .middleware(&ctx, || {
            next_calls.fetch_add(1, Ordering::SeqCst);
            async { "next" }
        })
        .await;

    assert_eq!(result.unwrap(), "next");
    assert_eq!(trace.entries(), vec!["posts", "blog"]);
    assert_eq!(next_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dispatch_reports_outcome() {
    let trace = Trace::new();
    let router = Tree::new()
        .controller("blog", "index", module! { "list" => traced(&trace, "blog", false) })
        .controller("index", "index", module! { "default" => traced(&trace, "root", false) })
        .router()
        .await;

    let outcome = router.dispatch(&RequestContext::new("/blog/list")).await.unwrap();
    assert_eq!(outcome.invoked, 2);
    assert!(!outcome.completed);
    assert_eq!(trace.entries(), vec!["blog", "root"]);
}

#[tokio::test]
async fn test_sent_response_stops_loop() {
    let trace = Trace::new();
    let router = Tree::new()
        .controller("blog", "index", module! { "list" => sending(&trace, "blog") })
        .controller("index", "index", module! { "default" => traced(&trace, "root", false) })
        .router()
        .await;

    let ctx = RequestContext::new("/blog/list");
    let outcome = router.dispatch(&ctx).await.unwrap();

    assert!(ctx.is_sent());
    assert_eq!(outcome.invoked, 1);
    assert!(!outcome.completed);
    assert_eq!(trace.entries(), vec!["blog"]);
}

#[tokio::test]
async fn test_already_sent_skips_handlers() {
    let trace = Trace::new();
    let router = Tree::new()
        .controller("blog", "index", module! { "list" => traced(&trace, "blog", false) })
        .router()
        .await;

    let ctx = RequestContext::new("/blog/list");
    ctx.mark_sent();

    let next_calls = AtomicUsize::new(0);
    router
        .middleware(&ctx, || {
            next_calls.fetch_add(1, Ordering::SeqCst);
            async {}
        })
        .await
        .unwrap();

    assert!(trace.entries().is_empty());
    assert_eq!(next_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handler_error_stops_loop() {
    let trace = Trace::new();
    let router = Tree::new()
        .controller("blog", "index", module! { "list" => failing(&trace, "blog") })
        .controller("index", "index", module! { "default" => traced(&trace, "root", false) })
        .router()
        .await;

    let next_calls = AtomicUsize::new(0);
    let err = router
        .middleware(&RequestContext::new("/blog/list"), || {
            next_calls.fetch_add(1, Ordering::SeqCst);
            async {}
        })
        .await
        .unwrap_err();

    match err {
        DispatchError::Handler {
            component,
            controller,
            method,
            source,
        } => {
            assert_eq!(component, "blog");
            assert_eq!(controller, "index");
            assert_eq!(method, "list");
            assert_eq!(source.to_string(), "blog exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(trace.entries(), vec!["blog"]);
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unmatched_path_falls_through() {
    let router = Tree::new()
        .controller("blog", "index", Module::new())
        .router()
        .await;

    let next_calls = AtomicUsize::new(0);
    let outcome = router
        .middleware(&RequestContext::new("/shop/cart"), || {
            next_calls.fetch_add(1, Ordering::SeqCst);
            async { 7 }
        })
        .await
        .unwrap();

    assert_eq!(outcome, 7);
    assert_eq!(next_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handlers_run_once_per_request() {
    let trace = Trace::new();
    let router = Tree::new()
        .controller("index", "index", module! { "default" => traced(&trace, "root", true) })
        .router()
        .await;

    for _ in 0..3 {
        let outcome = router.dispatch(&RequestContext::new("/")).await.unwrap();
        assert_eq!(outcome.invoked, 1);
        assert!(outcome.completed);
    }
    assert_eq!(trace.entries(), vec!["root", "root", "root"]);
}
