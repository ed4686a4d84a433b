//! # Positional Arguments and Extraction
//!
//! The binder turns a handler's declared parameter names into an [`Args`]
//! list; handlers then pull typed values out of it by position with the
//! [`FromArg`] extractor trait.
//!
//! ```rust,ignore
//! // Descriptor "user_id, page, done"
//! let user_id: String = args.extract(0)?;
//! let page: Option<i64> = args.extract(1)?;
//! let done: Done = args.extract(2)?;
//! ```

use crate::{
    context::{Done, RequestContext},
    value::Value,
};
use std::{any::Any, fmt, sync::Arc};

/// Error type for extraction failures.
#[derive(Debug)]
pub struct ExtractError {
    index: usize,
    message: String,
}

impl ExtractError {
    /// Create a new extraction error for the argument at `index`.
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }

    /// Position of the offending argument.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "argument {} could not be extracted: {}", self.index, self.message)
    }
}

impl std::error::Error for ExtractError {}

/// One bound argument.
#[derive(Clone, Debug)]
pub enum Arg {
    /// A value from the request context, an injector, or a declared default.
    Value(Value),
    /// The completion callback.
    Done(Done),
    /// The whole request context.
    Context(RequestContext),
    /// Nothing matched the parameter name.
    Absent,
}

impl Arg {
    /// Whether nothing was bound.
    pub fn is_absent(&self) -> bool {
        matches!(self, Arg::Absent)
    }

    /// Borrow the bound value, if this is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(value) => Some(value),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Arg::Value(value) => value.type_name(),
            Arg::Done(_) => "completion callback",
            Arg::Context(_) => "request context",
            Arg::Absent => "nothing",
        }
    }
}

/// Positional argument list produced by the binder.
#[derive(Clone, Debug, Default)]
pub struct Args {
    args: Vec<Arg>,
}

impl Args {
    /// Wrap a list of bound arguments.
    pub fn new(args: Vec<Arg>) -> Self {
        Self { args }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Borrow the argument at `index`.
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    /// Move the argument at `index` out, leaving [`Arg::Absent`] behind.
    pub fn take(&mut self, index: usize) -> Arg {
        self.args
            .get_mut(index)
            .map(|arg| std::mem::replace(arg, Arg::Absent))
            .unwrap_or(Arg::Absent)
    }

    /// Take the argument at `index` and convert it.
    pub fn extract<T: FromArg>(&mut self, index: usize) -> Result<T, ExtractError> {
        let arg = self.take(index);
        T::from_arg(arg).map_err(|message| ExtractError::new(index, message))
    }

    /// Iterate over the arguments.
    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter()
    }
}

impl From<Vec<Arg>> for Args {
    fn from(args: Vec<Arg>) -> Self {
        Self::new(args)
    }
}

/// A trait for converting a bound [`Arg`] into a handler parameter type.
///
/// Failures carry a message; [`Args::extract`] adds the position.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a handler parameter",
    label = "missing `FromArg` implementation",
    note = "Use `Value`, a scalar, `Arc<T>`, `Done`, `RequestContext`, or an `Option` of these."
)]
pub trait FromArg: Sized {
    /// Attempt the conversion.
    fn from_arg(arg: Arg) -> Result<Self, String>;
}

impl FromArg for Arg {
    fn from_arg(arg: Arg) -> Result<Self, String> {
        Ok(arg)
    }
}

impl FromArg for Done {
    fn from_arg(arg: Arg) -> Result<Self, String> {
        match arg {
            Arg::Done(done) => Ok(done),
            other => Err(format!("expected completion callback, found {}", other.kind())),
        }
    }
}

impl FromArg for RequestContext {
    fn from_arg(arg: Arg) -> Result<Self, String> {
        match arg {
            Arg::Context(ctx) => Ok(ctx),
            other => Err(format!("expected request context, found {}", other.kind())),
        }
    }
}

impl FromArg for Value {
    fn from_arg(arg: Arg) -> Result<Self, String> {
        match arg {
            Arg::Value(value) => Ok(value),
            other => Err(format!("expected value, found {}", other.kind())),
        }
    }
}

// Absent and null become `None`, as does a value of the wrong type.
impl<T: FromArg> FromArg for Option<T> {
    fn from_arg(arg: Arg) -> Result<Self, String> {
        match arg {
            Arg::Absent | Arg::Value(Value::Null) => Ok(None),
            other => Ok(T::from_arg(other).ok()),
        }
    }
}

impl<T: Any + Send + Sync> FromArg for Arc<T> {
    fn from_arg(arg: Arg) -> Result<Self, String> {
        match &arg {
            Arg::Value(value) => value.downcast::<T>().ok_or_else(|| {
                format!(
                    "expected shared {}, found {}",
                    std::any::type_name::<T>(),
                    arg.kind()
                )
            }),
            _ => Err(format!(
                "expected shared {}, found {}",
                std::any::type_name::<T>(),
                arg.kind()
            )),
        }
    }
}

/// Macro to implement FromArg for scalar types backed by a `Value` accessor.
macro_rules! impl_from_arg_scalar {
    ($ty:ty, $expected:literal, |$v:ident| $convert:expr) => {
        impl FromArg for $ty {
            fn from_arg(arg: Arg) -> Result<Self, String> {
                let found = arg.kind();
                match arg {
                    Arg::Value($v) => $convert
                        .ok_or_else(|| format!(concat!("expected ", $expected, ", found {}"), found)),
                    _ => Err(format!(concat!("expected ", $expected, ", found {}"), found)),
                }
            }
        }
    };
}

impl_from_arg_scalar!(String, "string", |v| match v {
    Value::Str(s) => Some(s),
    _ => None,
});
impl_from_arg_scalar!(i64, "int", |v| v.as_i64());
impl_from_arg_scalar!(f64, "float", |v| v.as_f64());
impl_from_arg_scalar!(bool, "bool", |v| v.as_bool());
