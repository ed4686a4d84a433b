//! # switchyard-std
//!
//! Standard collaborators for the Switchyard router.
//!
//! This crate provides:
//! - **Discovery**: [`FsDiscovery`], walking a directory tree with `tokio::fs`
//! - **Loading**: [`StaticLoader`], modules registered up front by key
//! - **Hot reload**: [`ReloadWatcher`], polling a source file's modification time
//! - **Standard listeners**: Logging, Filter
//! - **Testing utilities**: recording listeners, counting handlers, in-memory trees

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use switchyard_core;

// Modules
pub mod discovery;
pub mod listeners;
pub mod loader;
pub mod testing;
pub mod watch;

pub use discovery::FsDiscovery;
pub use loader::StaticLoader;
pub use watch::ReloadWatcher;
