//! Polling hot-reload watcher.
//!
//! A [`ReloadWatcher`] samples the modification time of a [`Reloadable`]'s
//! source file on a fixed interval and asks it to reload whenever the time
//! changes. The watcher only holds a weak reference: once the watched entity
//! is dropped, the task ends on its next tick.

use std::{
    path::Path,
    sync::{Arc, Weak},
    time::{Duration, SystemTime},
};
use switchyard_core::Reloadable;
use tokio::{task::JoinHandle, time};

async fn modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .and_then(|metadata| metadata.modified())
        .ok()
}

/// Handle to a background watch task. Dropping it stops the task.
#[derive(Debug)]
pub struct ReloadWatcher {
    handle: JoinHandle<()>,
}

impl ReloadWatcher {
    /// Start watching `target`'s source file.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R: Reloadable>(target: &Arc<R>, interval: Duration) -> Self {
        let weak = Arc::downgrade(target);
        let handle = tokio::spawn(watch(weak, interval));
        Self { handle }
    }

    /// Whether the watch task has ended.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop watching.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for ReloadWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn watch<R: Reloadable>(target: Weak<R>, interval: Duration) {
    let mut last = match target.upgrade() {
        Some(target) => modified(target.source()).await,
        None => return,
    };
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(target) = target.upgrade() else {
            break;
        };
        let current = modified(target.source()).await;
        if current.is_none() || current == last {
            continue;
        }
        last = current;

        tracing::debug!(source = %target.source().display(), "Source changed, reloading");
        if let Err(err) = target.reload().await {
            tracing::warn!(source = %target.source().display(), error = %err, "Reload failed");
        }
    }
}
