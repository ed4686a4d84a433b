//! Directory-tree enumeration.
//!
//! The engine never touches the filesystem itself. It asks a [`Discovery`]
//! implementation for the component directories under a set of roots and for
//! the controller module files inside each component. `switchyard-std`
//! provides the filesystem-backed implementation.

use crate::error::DiscoveryError;
use std::{
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
};

/// Enumerates components and controllers.
///
/// Both operations must return a deduplicated, order-stable result: running
/// them twice over an unchanged tree yields the same sequence.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot enumerate components",
    label = "missing `Discovery` implementation",
    note = "Use `FsDiscovery` from `switchyard-std` or implement `Discovery` for an in-memory tree."
)]
pub trait Discovery: Send + Sync + 'static {
    /// List component directories directly under each of `roots`.
    fn component_dirs(
        &self,
        roots: &[PathBuf],
    ) -> impl Future<Output = Result<Vec<PathBuf>, DiscoveryError>> + Send;

    /// List controller module files belonging to the component at `component`.
    ///
    /// A component without a controllers directory has no controllers; that is
    /// not an error.
    fn controller_files(
        &self,
        component: &Path,
    ) -> impl Future<Output = Result<Vec<PathBuf>, DiscoveryError>> + Send;
}

/// Dynamic object-safe version of [`Discovery`].
pub trait DynDiscovery: Send + Sync + 'static {
    /// See [`Discovery::component_dirs`].
    fn component_dirs_dyn<'a>(
        &'a self,
        roots: &'a [PathBuf],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>, DiscoveryError>> + Send + 'a>>;

    /// See [`Discovery::controller_files`].
    fn controller_files_dyn<'a>(
        &'a self,
        component: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>, DiscoveryError>> + Send + 'a>>;
}

impl<T: Discovery> DynDiscovery for T {
    fn component_dirs_dyn<'a>(
        &'a self,
        roots: &'a [PathBuf],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>, DiscoveryError>> + Send + 'a>> {
        Box::pin(self.component_dirs(roots))
    }

    fn controller_files_dyn<'a>(
        &'a self,
        component: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>, DiscoveryError>> + Send + 'a>> {
        Box::pin(self.controller_files(component))
    }
}

impl<T: Discovery> Discovery for std::sync::Arc<T> {
    fn component_dirs(
        &self,
        roots: &[PathBuf],
    ) -> impl Future<Output = Result<Vec<PathBuf>, DiscoveryError>> + Send {
        (**self).component_dirs(roots)
    }

    fn controller_files(
        &self,
        component: &Path,
    ) -> impl Future<Output = Result<Vec<PathBuf>, DiscoveryError>> + Send {
        (**self).controller_files(component)
    }
}

/// Name of the entity backed by `path`: its file stem, or its final
/// component for directories.
pub fn entity_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_name() {
        assert_eq!(entity_name(Path::new("/srv/app/blog")), "blog");
        assert_eq!(entity_name(Path::new("/srv/app/blog/controllers/posts.rs")), "posts");
        assert_eq!(entity_name(Path::new("index.rs")), "index");
        assert_eq!(entity_name(Path::new("")), "");
    }
}
