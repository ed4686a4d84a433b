//! Filesystem discovery.
//!
//! Layout convention:
//!
//! ```text
//! <root>/
//!   <component>/
//!     controllers/
//!       <controller>.rs
//! ```
//!
//! Every directory directly under a root is a component. Every file with a
//! recognized extension directly under the component's controllers directory
//! is a controller. Results are sorted by name within each root and
//! deduplicated across roots.

use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};
use switchyard_core::{Discovery, DiscoveryError};

/// Default name of the per-component controllers directory.
pub const CONTROLLERS_DIR: &str = "controllers";

/// Default recognized controller module extensions.
pub const EXTENSIONS: &[&str] = &["rs"];

/// [`Discovery`] over a real directory tree.
#[derive(Debug, Clone)]
pub struct FsDiscovery {
    controllers_dir: String,
    extensions: Vec<String>,
}

impl FsDiscovery {
    /// Create a discovery with the default layout.
    pub fn new() -> Self {
        Self {
            controllers_dir: CONTROLLERS_DIR.to_owned(),
            extensions: EXTENSIONS.iter().map(|ext| (*ext).to_owned()).collect(),
        }
    }

    /// Look for controllers in a differently named subdirectory.
    pub fn with_controllers_dir(mut self, dir: impl Into<String>) -> Self {
        self.controllers_dir = dir.into();
        self
    }

    /// Replace the set of recognized extensions (without leading dots).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_owned())
            .collect();
        self
    }

    /// The controllers subdirectory name.
    pub fn controllers_dir(&self) -> &str {
        &self.controllers_dir
    }

    fn recognized(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }
}

impl Default for FsDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

/// List entries of `dir` accepted by `keep`, sorted by path.
async fn list_sorted(
    dir: &Path,
    keep: impl Fn(&Path, bool) -> bool,
) -> io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let is_dir = entry.file_type().await?.is_dir();
        let path = entry.path();
        if keep(&path, is_dir) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

impl Discovery for FsDiscovery {
    async fn component_dirs(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>, DiscoveryError> {
        let mut seen = HashSet::new();
        let mut dirs = Vec::new();
        for root in roots {
            let listed = list_sorted(root, |path, is_dir| is_dir && !is_hidden(path))
                .await
                .map_err(|source| DiscoveryError::Io {
                    path: root.clone(),
                    source,
                })?;
            for dir in listed {
                if seen.insert(dir.clone()) {
                    dirs.push(dir);
                }
            }
        }
        tracing::trace!(roots = roots.len(), components = dirs.len(), "Enumerated component directories");
        Ok(dirs)
    }

    async fn controller_files(&self, component: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        let dir = component.join(&self.controllers_dir);
        match list_sorted(&dir, |path, is_dir| {
            !is_dir && !is_hidden(path) && self.recognized(path)
        })
        .await
        {
            Ok(files) => Ok(files),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(DiscoveryError::Io { path: dir, source }),
        }
    }
}
