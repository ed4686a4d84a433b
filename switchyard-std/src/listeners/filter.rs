//! Filter listener for conditional event observation.

use switchyard_core::{EventKind, EventListener, RouterEvent};

/// A listener that forwards only events matching a predicate.
pub struct FilterListener<L, F> {
    inner: L,
    predicate: F,
}

impl<L, F> FilterListener<L, F> {
    /// Create a new filter listener.
    pub fn new(predicate: F, inner: L) -> Self {
        Self { inner, predicate }
    }
}

impl<L: EventListener> FilterListener<L, Box<dyn Fn(&RouterEvent) -> bool + Send + Sync>> {
    /// Forward only events of the given kinds.
    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>, inner: L) -> Self {
        let kinds: Vec<EventKind> = kinds.into_iter().collect();
        Self::new(
            Box::new(move |event: &RouterEvent| kinds.contains(&event.kind())),
            inner,
        )
    }
}

impl<L, F> EventListener for FilterListener<L, F>
where
    L: EventListener,
    F: Fn(&RouterEvent) -> bool + Send + Sync + 'static,
{
    fn on_event(&self, event: &RouterEvent) {
        if (self.predicate)(event) {
            self.inner.on_event(event);
        }
    }
}
