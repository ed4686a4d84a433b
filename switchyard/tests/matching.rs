//! Path resolution against a loaded registry.

use std::collections::HashSet;
use switchyard::{Args, Module, sync_handler_fn};

mod common;
use common::{Tree, label};

fn exports(names: &[&str]) -> Module {
    let mut module = Module::new();
    for name in names {
        module.export(*name, sync_handler_fn("", |_: Args| ()));
    }
    module
}

fn candidates(router: &switchyard::Router, path: &str) -> Vec<String> {
    router.registry().match_path(path).iter().map(label).collect()
}

#[tokio::test]
async fn test_fallback_chain_order() {
    let router = Tree::new()
        .controller("index", "index", exports(&["list", "default"]))
        .controller("blog", "index", exports(&["list"]))
        .router()
        .await;

    assert_eq!(
        candidates(&router, "/blog/list"),
        vec!["blog/index.list", "index/index.list"]
    );
}

#[tokio::test]
async fn test_method_falls_back_to_default() {
    let router = Tree::new()
        .controller("index", "index", exports(&["default"]))
        .controller("blog", "index", exports(&["list"]))
        .router()
        .await;

    assert_eq!(
        candidates(&router, "/blog/list"),
        vec!["blog/index.list", "index/index.default"]
    );
    // blog/index has neither `show` nor `default`.
    assert_eq!(candidates(&router, "/blog/show"), vec!["index/index.default"]);
}

#[tokio::test]
async fn test_full_priority_order() {
    let router = Tree::new()
        .controller("index", "index", exports(&["default"]))
        .controller("index", "posts", exports(&["default"]))
        .controller("blog", "index", exports(&["default"]))
        .controller("blog", "posts", exports(&["edit"]))
        .router()
        .await;

    assert_eq!(
        candidates(&router, "/blog/posts/edit"),
        vec![
            "blog/posts.edit",
            "blog/index.default",
            "index/posts.default",
            "index/index.default",
        ]
    );
}

#[tokio::test]
async fn test_candidates_bounded_and_unique() {
    let router = Tree::new()
        .controller("index", "index", exports(&["default", "a"]))
        .controller("index", "posts", exports(&["default", "a"]))
        .controller("blog", "index", exports(&["default", "a"]))
        .controller("blog", "posts", exports(&["default", "a"]))
        .router()
        .await;

    let paths = [
        "/",
        "",
        "///",
        "/blog",
        "/blog/a",
        "/blog/posts/a",
        "/blog/posts/a/b/c/d",
        "/posts",
        "/posts/a",
        "/missing/posts/a",
        "/ blog / posts / a ",
    ];
    for path in paths {
        let found = candidates(&router, path);
        assert!(found.len() <= 4, "{path}: {found:?}");
        let unique: HashSet<_> = found.iter().collect();
        assert_eq!(unique.len(), found.len(), "{path}: {found:?}");
    }
}

#[tokio::test]
async fn test_root_collapses_to_single_candidate() {
    let router = Tree::new()
        .controller("index", "index", exports(&["default"]))
        .router()
        .await;

    assert_eq!(candidates(&router, "/"), vec!["index/index.default"]);
}

#[tokio::test]
async fn test_reserved_tokens_never_match() {
    let router = Tree::new()
        .controller("index", "index", exports(&["default", "list"]))
        .controller("blog", "index", exports(&["default", "list"]))
        .router()
        .await;

    assert!(candidates(&router, "/index").is_empty());
    assert!(candidates(&router, "/index/list").is_empty());
    assert!(candidates(&router, "/blog/index").is_empty());
    assert!(candidates(&router, "/blog/index/list").is_empty());
    assert!(candidates(&router, "/blog/posts/default").is_empty());
}

#[tokio::test]
async fn test_no_match_is_empty() {
    let router = Tree::new()
        .controller("blog", "index", exports(&["list"]))
        .router()
        .await;

    assert!(candidates(&router, "/shop/cart").is_empty());
}

#[tokio::test]
async fn test_failed_component_never_matches() {
    let router = Tree::new()
        .controller("index", "index", exports(&["default"]))
        .controller("blog", "index", exports(&["list"]))
        .broken("blog", "drafts")
        .router()
        .await;

    assert_eq!(candidates(&router, "/blog/list"), vec!["index/index.default"]);
}
