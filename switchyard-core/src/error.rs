//! Error types for Switchyard.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`SwitchyardError`] - Top-level error type for all Switchyard operations
//! - [`ProcedureError`] - A one-time operation was invoked out of order
//! - [`LoadError`] - A controller module could not be imported
//! - [`DiscoveryError`] - The directory tree could not be enumerated
//! - [`DispatchError`] - A request could not be dispatched

use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Switchyard operations.
#[derive(Error, Debug)]
pub enum SwitchyardError {
    /// A one-time operation was misused.
    #[error("procedure error: {0}")]
    Procedure(#[from] ProcedureError),

    /// A controller module failed to load.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// The component tree could not be enumerated.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// A request could not be dispatched.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Programmer errors in the lifecycle of an entity.
///
/// These are never recovered automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcedureError {
    /// `init` was called a second time on the same instance.
    #[error("init called twice on {0}")]
    InitCalledTwice(String),

    /// An operation that requires `init` ran before it.
    #[error("{0} has not been initialized")]
    NotInitialized(String),
}

/// Errors raised while importing a controller module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No module is known for the given source path.
    #[error("no module registered for {}", .0.display())]
    NotFound(PathBuf),

    /// The module raised an error while being imported.
    #[error("module {} failed to import: {reason}", .path.display())]
    Import {
        /// Source path of the module.
        path: PathBuf,
        /// Rendered cause.
        reason: String,
    },

    /// The import did not finish within the configured deadline.
    #[error("module {} did not load within {:?}", .0.display(), .1)]
    Timeout(PathBuf, Duration),
}

impl LoadError {
    /// Wrap an arbitrary error raised by a module factory.
    pub fn import(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        LoadError::Import {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

/// Errors raised while enumerating component directories or controller files.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// A directory could not be read.
    #[error("failed to read {}", .path.display())]
    Io {
        /// The directory being enumerated.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while dispatching a request.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A handler returned an error. The dispatch loop stopped at this handler.
    #[error("handler {component}/{controller}#{method} failed")]
    Handler {
        /// Owning component name.
        component: String,
        /// Owning controller name.
        controller: String,
        /// Method name as exported by the controller.
        method: String,
        /// The error raised by the handler.
        #[source]
        source: BoxError,
    },

    /// The router failed to load and can never serve requests.
    #[error("router unavailable: {0}")]
    Unavailable(String),
}
