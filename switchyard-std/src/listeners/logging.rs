//! Logging listener for event observation.

use switchyard_core::{EventListener, RouterEvent};

/// A listener that forwards every event to `tracing`.
///
/// Lifecycle events log at `debug`, failures at `warn`, and routing events at
/// `trace` so per-request noise stays off by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl EventListener for LoggingListener {
    fn on_event(&self, event: &RouterEvent) {
        match event {
            RouterEvent::Load(origin) => tracing::debug!(%origin, "Loaded"),
            RouterEvent::Ready(origin) => tracing::debug!(%origin, "Ready"),
            RouterEvent::Failed { origin, reason } => {
                tracing::warn!(%origin, %reason, "Failed to load")
            }
            RouterEvent::Routing(routing) => tracing::trace!(
                controller = %routing.controller,
                path = %routing.request_path,
                method = %routing.method,
                "Routing"
            ),
        }
    }
}
