//! Lifecycle states and the readiness barrier.

use std::{
    collections::HashSet,
    fmt,
    sync::Mutex,
};
use tokio::sync::watch;

/// Where an entity is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Constructed, nothing started.
    #[default]
    Unloaded,
    /// Importing its module or enumerating its children.
    Loading,
    /// Import or enumeration finished.
    Loaded,
    /// Ready to serve requests.
    Ready,
    /// Loading failed; carries the rendered cause.
    Failed(String),
}

impl LifecycleState {
    /// Whether the state is [`Ready`](Self::Ready).
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready)
    }

    /// Whether loading has come to rest, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self, LifecycleState::Ready | LifecycleState::Failed(_))
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Unloaded => f.write_str("unloaded"),
            LifecycleState::Loading => f.write_str("loading"),
            LifecycleState::Loaded => f.write_str("loaded"),
            LifecycleState::Ready => f.write_str("ready"),
            LifecycleState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Observable lifecycle cell.
///
/// Waiters suspend on a `watch` channel instead of polling.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Unloaded);
        Self { tx }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.tx.borrow().clone()
    }

    /// Replace the state, returning the previous one.
    pub(crate) fn set(&self, state: LifecycleState) -> LifecycleState {
        self.tx.send_replace(state)
    }

    /// Wait until the state satisfies `predicate` and return it.
    pub(crate) async fn wait_for(&self, predicate: impl Fn(&LifecycleState) -> bool) -> LifecycleState {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(|state| predicate(state)).await {
            Ok(state) => state.clone(),
            // The sender lives as long as `self`.
            Err(_) => self.state(),
        }
    }
}

// ============================================================================
// ReadinessBarrier
// ============================================================================

/// Fires exactly once, after every expected child has completed.
///
/// Children are tracked by name, so completing the same child twice counts
/// once. The barrier only fires after [`arm`](Self::arm), which marks the set
/// of children as known; a barrier armed with no children fires immediately.
#[derive(Debug, Default)]
pub struct ReadinessBarrier {
    inner: Mutex<BarrierState>,
}

#[derive(Debug, Default)]
struct BarrierState {
    expected: HashSet<String>,
    completed: HashSet<String>,
    armed: bool,
    fired: bool,
}

impl BarrierState {
    fn try_fire(&mut self) -> bool {
        if self.fired || !self.armed {
            return false;
        }
        if self.expected.iter().all(|name| self.completed.contains(name)) {
            self.fired = true;
            return true;
        }
        false
    }
}

impl ReadinessBarrier {
    /// Create an unarmed barrier without children.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BarrierState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a child the barrier must wait for.
    ///
    /// Has no effect on a barrier that already fired.
    pub fn expect(&self, name: impl Into<String>) {
        let mut state = self.lock();
        if !state.fired {
            state.expected.insert(name.into());
        }
    }

    /// Record that the set of children is complete.
    ///
    /// Returns `true` if this call fired the barrier.
    pub fn arm(&self) -> bool {
        let mut state = self.lock();
        state.armed = true;
        state.try_fire()
    }

    /// Record a child's completion.
    ///
    /// Returns `true` only for the call that fired the barrier. Unknown names
    /// and repeated completions are ignored.
    pub fn complete(&self, name: &str) -> bool {
        let mut state = self.lock();
        if !state.expected.contains(name) {
            return false;
        }
        state.completed.insert(name.to_owned());
        state.try_fire()
    }

    /// Stop waiting for a child.
    ///
    /// Returns `true` if removing it fired the barrier.
    pub fn forget(&self, name: &str) -> bool {
        let mut state = self.lock();
        state.expected.remove(name);
        state.completed.remove(name);
        state.try_fire()
    }

    /// Whether the barrier has fired.
    pub fn is_fired(&self) -> bool {
        self.lock().fired
    }

    /// Children that have not completed yet, sorted.
    pub fn pending(&self) -> Vec<String> {
        let state = self.lock();
        let mut pending: Vec<String> = state
            .expected
            .difference(&state.completed)
            .cloned()
            .collect();
        pending.sort();
        pending
    }

    /// Number of distinct children that completed.
    pub fn completed(&self) -> usize {
        let state = self.lock();
        state.completed.intersection(&state.expected).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_waits_for_every_child() {
        let barrier = ReadinessBarrier::new();
        barrier.expect("index");
        barrier.expect("posts");
        assert!(!barrier.arm());

        assert!(!barrier.complete("index"));
        assert_eq!(barrier.pending(), vec!["posts".to_owned()]);
        assert!(barrier.complete("posts"));
        assert!(barrier.is_fired());
    }

    #[test]
    fn test_duplicate_completion_does_not_over_count() {
        let barrier = ReadinessBarrier::new();
        barrier.expect("index");
        barrier.expect("posts");
        barrier.arm();

        assert!(!barrier.complete("index"));
        assert!(!barrier.complete("index"));
        assert_eq!(barrier.completed(), 1);
        assert!(!barrier.is_fired());
    }

    #[test]
    fn test_fires_once() {
        let barrier = ReadinessBarrier::new();
        barrier.expect("index");
        barrier.arm();
        assert!(barrier.complete("index"));
        assert!(!barrier.complete("index"));
        assert!(!barrier.arm());
    }

    #[test]
    fn test_completion_before_arming() {
        let barrier = ReadinessBarrier::new();
        barrier.expect("index");
        assert!(!barrier.complete("index"));
        assert!(barrier.arm());
    }

    #[test]
    fn test_empty_barrier_fires_on_arm() {
        let barrier = ReadinessBarrier::new();
        assert!(barrier.arm());
    }

    #[test]
    fn test_forget_pending_child() {
        let barrier = ReadinessBarrier::new();
        barrier.expect("index");
        barrier.expect("stalled");
        barrier.arm();
        barrier.complete("index");
        assert!(barrier.forget("stalled"));
    }

    #[tokio::test]
    async fn test_lifecycle_wait() {
        let lifecycle = std::sync::Arc::new(Lifecycle::new());
        let waiter = lifecycle.clone();
        let handle = tokio::spawn(async move { waiter.wait_for(LifecycleState::is_settled).await });

        lifecycle.set(LifecycleState::Loading);
        lifecycle.set(LifecycleState::Ready);
        assert_eq!(handle.await.unwrap(), LifecycleState::Ready);
    }
}
