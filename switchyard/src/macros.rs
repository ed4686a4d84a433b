//! Declarative macros.

/// Build a [`Module`](crate::Module) from handler values.
///
/// ```rust,ignore
/// // Export each handler under its own name.
/// let module = module!(list, show, default);
///
/// // Or name the exports explicitly.
/// let module = module! {
///     "list" => handler_fn("page", |args| async move { Ok::<_, BoxError>(()) }),
///     "default" => fallback,
/// };
/// ```
#[macro_export]
macro_rules! module {
    () => {
        $crate::Module::new()
    };
    ($($name:literal => $handler:expr),+ $(,)?) => {{
        let mut module = $crate::Module::new();
        $( module.export($name, $handler); )+
        module
    }};
    ($($handler:ident),+ $(,)?) => {{
        let mut module = $crate::Module::new();
        $( module.export(stringify!($handler), $handler); )+
        module
    }};
}
