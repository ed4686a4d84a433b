//! Procedural macros for Switchyard.

use proc_macro::TokenStream;

mod handler;

/// Turn a function into a controller handler.
///
/// The function is replaced by a unit struct of the same name implementing
/// `switchyard::Handler`, so it can be exported as-is. Parameter names become
/// the handler's descriptor: each one is bound by name from the request
/// context, the injectors, or the reserved `done` / `ctx` tokens, then
/// extracted into the declared type with `FromArg`.
///
/// Leading underscores are stripped from parameter names, so `_ctx` still
/// binds the request context. A parameter may declare a default with
/// `#[default(literal)]`.
///
/// ```rust,ignore
/// #[handler]
/// async fn list(user_id: String, #[default(1)] page: i64, done: Done) -> Result<(), BoxError> {
///     done.signal();
///     Ok(())
/// }
///
/// #[handler(name = "show_post")]
/// fn show(id: Option<String>) {}
/// ```
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    handler::handler_impl(attr, item)
}
