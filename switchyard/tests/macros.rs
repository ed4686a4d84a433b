//! `#[handler]` and `module!` used the way controller modules use them.

use std::sync::atomic::{AtomicI64, Ordering};
use switchyard::prelude::*;

mod common;
use common::{ROOT, Tree};

static LAST_PAGE: AtomicI64 = AtomicI64::new(0);

#[handler]
async fn list(#[default(1)] page: i64, done: Done) -> Result<(), BoxError> {
    LAST_PAGE.store(page, Ordering::SeqCst);
    done.signal();
    Ok(())
}

#[handler]
fn show(id: Option<String>, _ctx: RequestContext) {
    if id.is_some() {
        _ctx.mark_sent();
    }
}

#[handler(name = "fallback")]
fn default(#[default("guest")] user: String, ctx: RequestContext) {
    ctx.insert("greeted", user);
}

#[handler]
fn greet(#[default("a,b")] user: String, #[default("it's")] note: String, ctx: RequestContext) {
    ctx.insert("greeted", format!("{user}|{note}"));
}

#[test]
fn test_descriptors_follow_signatures() {
    assert_eq!(list.descriptor(), "page = 1, done");
    assert_eq!(show.descriptor(), "id, ctx");
    assert_eq!(fallback.descriptor(), "user = 'guest', ctx");
    assert_eq!(greet.descriptor(), r"user = 'a,b', note = 'it\'s', ctx");
}

#[tokio::test]
async fn test_string_defaults_with_commas_and_quotes() {
    let router = Tree::new()
        .controller("index", "index", module! { "default" => greet })
        .router()
        .await;

    let ctx = RequestContext::new("/");
    router.dispatch(&ctx).await.unwrap();
    assert_eq!(ctx.get("greeted"), Some(Value::from("a,b|it's")));
}

#[test]
fn test_module_macro_forms() {
    let named = module!(list, show);
    assert_eq!(named.names().collect::<Vec<_>>(), vec!["list", "show"]);

    let explicit = module! { "default" => fallback, "index" => show };
    assert_eq!(explicit.names().collect::<Vec<_>>(), vec!["default", "index"]);

    assert!(module!().is_empty());
}

#[tokio::test]
async fn test_macro_handlers_dispatch() {
    let router = Tree::new()
        .controller("blog", "index", module!(list, show))
        .controller("index", "index", module! { "default" => fallback })
        .router()
        .await;

    let outcome = router
        .dispatch(&RequestContext::new("/blog/list").with("page", 4i64))
        .await
        .unwrap();
    assert!(outcome.completed);
    assert_eq!(outcome.invoked, 1);
    assert_eq!(LAST_PAGE.load(Ordering::SeqCst), 4);

    let ctx = RequestContext::new("/blog/show").with("id", "7");
    router.dispatch(&ctx).await.unwrap();
    assert!(ctx.is_sent());

    // `show` without an id neither sends nor completes, so the fallback runs.
    let ctx = RequestContext::new("/blog/show");
    let outcome = router.dispatch(&ctx).await.unwrap();
    assert_eq!(outcome.invoked, 2);
    assert_eq!(ctx.get("greeted"), Some(Value::from("guest")));
}

#[tokio::test]
async fn test_extraction_failure_is_a_handler_error() {
    let router = Tree::new()
        .controller("blog", "index", module!(list))
        .router()
        .await;

    let err = router
        .dispatch(&RequestContext::new("/blog/list").with("page", "not a number"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Handler { ref method, .. } if method == "list"));
}

#[tokio::test]
async fn test_builder_injection_reaches_macro_handler() {
    let router = Tree::new()
        .controller("index", "index", module! { "default" => fallback })
        .builder()
        .inject_value("user", "admin")
        .build();
    router.init([ROOT]).await.unwrap();

    let ctx = RequestContext::new("/");
    router.dispatch(&ctx).await.unwrap();
    assert_eq!(ctx.get("greeted"), Some(Value::from("admin")));
}
