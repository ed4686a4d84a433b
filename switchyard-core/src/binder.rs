//! Parameter binding.
//!
//! Maps each declared parameter name to a runtime value. A parameter named
//! [`DONE`] always receives the completion callback. For every other name the
//! first matching source wins:
//!
//! 1. a value stored under that name in the [`RequestContext`];
//! 2. an injector registered under that name (factories are invoked);
//! 3. the request context itself, if the name is [`CONTEXT`];
//! 4. the parameter's declared default;
//! 5. otherwise [`Arg::Absent`].

use crate::{
    args::{Arg, Args},
    context::{Done, Injectors, RequestContext},
    params::{Param, ParamList},
};

/// Parameter name bound to the completion callback.
pub const DONE: &str = "done";

/// Parameter name bound to the whole request context.
pub const CONTEXT: &str = "ctx";

/// Resolve a single parameter.
pub fn resolve(param: &Param, ctx: &RequestContext, injectors: &Injectors, done: &Done) -> Arg {
    let name = param.name();
    if name == DONE {
        return Arg::Done(done.clone());
    }
    if let Some(value) = ctx.get(name) {
        return Arg::Value(value);
    }
    if let Some(value) = injectors.resolve(name) {
        return Arg::Value(value);
    }
    if name == CONTEXT {
        return Arg::Context(ctx.clone());
    }
    match param.default_value() {
        Some(value) => Arg::Value(value.clone()),
        None => Arg::Absent,
    }
}

/// Build the positional argument list for a handler.
pub fn bind(params: &ParamList, ctx: &RequestContext, injectors: &Injectors, done: &Done) -> Args {
    params
        .iter()
        .map(|param| resolve(param, ctx, injectors, done))
        .collect::<Vec<_>>()
        .into()
}
