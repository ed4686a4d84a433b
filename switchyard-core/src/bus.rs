//! # Event Bus
//!
//! A tree of event nodes mirroring the component tree. The router owns the
//! root; the registry, every component and every controller get a child node
//! at construction. Emitting on a node delivers the event to that node's
//! listeners and then to each ancestor's, unchanged, so an observer on the
//! root sees every nested event without polling.
//!
//! Child → parent links are weak: a node never keeps its parent alive, and
//! the entities owning nodes never hold strong references upward.
//!
//! # Delivery
//!
//! - [`EventBus::on`] registers a synchronous [`EventListener`], invoked inline
//!   by `emit` in registration order
//! - [`EventBus::subscribe`] returns a `tokio` broadcast receiver for async
//!   consumers; slow receivers lag rather than block emitters
//!
//! Events emitted from inside a listener are queued and delivered once the
//! event being delivered has reached the root, so every observer sees a
//! child's event before any event it caused.

use crate::event::{EventKind, RouterEvent};
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
    sync::{
        Arc, RwLock, Weak,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::broadcast;

const BROADCAST_CAPACITY: usize = 256;

thread_local! {
    // Present while this thread is delivering an event.
    static PENDING: RefCell<Option<VecDeque<(Arc<Node>, RouterEvent)>>> =
        const { RefCell::new(None) };
}

/// Clears the pending queue when the outermost delivery ends, even on panic.
struct Draining;

impl Drop for Draining {
    fn drop(&mut self) {
        PENDING.with(|pending| *pending.borrow_mut() = None);
    }
}

/// Queue the event if a delivery is in progress, otherwise hand it back.
fn defer(node: Arc<Node>, event: RouterEvent) -> Option<(Arc<Node>, RouterEvent)> {
    PENDING.with(|pending| match pending.borrow_mut().as_mut() {
        Some(queue) => {
            queue.push_back((node, event));
            None
        }
        None => Some((node, event)),
    })
}

fn propagate(start: Arc<Node>, event: &RouterEvent) {
    let mut current = Some(start);
    while let Some(node) = current {
        node.deliver(event);
        current = node.parent();
    }
}

/// Observer of router events.
pub trait EventListener: Send + Sync + 'static {
    /// Called for every event reaching the node the listener is attached to.
    fn on_event(&self, event: &RouterEvent);
}

impl<F> EventListener for F
where
    F: Fn(&RouterEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: &RouterEvent) {
        (self)(event)
    }
}

type SharedListener = Arc<dyn EventListener>;

struct Node {
    listeners: RwLock<Vec<(u64, SharedListener)>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<RouterEvent>,
    parent: RwLock<Option<Weak<Node>>>,
}

impl Node {
    fn new(parent: Option<Weak<Node>>) -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            sender,
            parent: RwLock::new(parent),
        }
    }

    fn deliver(&self, event: &RouterEvent) {
        // Snapshot so listeners may attach or detach while being notified.
        let listeners: Vec<SharedListener> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener.on_event(event);
        }
        let _ = self.sender.send(event.clone());
    }

    fn parent(&self) -> Option<Arc<Node>> {
        self.parent
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .and_then(Weak::upgrade)
    }
}

/// Handle to one node of the event tree.
#[derive(Clone)]
pub struct EventBus {
    node: Arc<Node>,
}

impl EventBus {
    /// Create a root node.
    pub fn new() -> Self {
        Self {
            node: Arc::new(Node::new(None)),
        }
    }

    /// Create a node whose events propagate to this one.
    pub fn child(&self) -> Self {
        Self {
            node: Arc::new(Node::new(Some(Arc::downgrade(&self.node)))),
        }
    }

    /// Stop propagating this node's events upward.
    pub fn detach(&self) {
        *self
            .node
            .parent
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Whether this node still forwards to a live parent.
    pub fn is_attached(&self) -> bool {
        self.node.parent().is_some()
    }

    /// Deliver `event` here and to every ancestor.
    pub fn emit(&self, event: RouterEvent) {
        let Some((node, event)) = defer(self.node.clone(), event) else {
            return;
        };

        PENDING.with(|pending| *pending.borrow_mut() = Some(VecDeque::new()));
        let _draining = Draining;
        propagate(node, &event);
        while let Some((node, event)) =
            PENDING.with(|pending| pending.borrow_mut().as_mut().and_then(VecDeque::pop_front))
        {
            propagate(node, &event);
        }
    }

    /// Attach a listener.
    pub fn on<L: EventListener>(&self, listener: L) -> Subscription {
        let id = self.node.next_id.fetch_add(1, Ordering::Relaxed);
        self.node
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, Arc::new(listener)));
        Subscription {
            node: Arc::downgrade(&self.node),
            id,
        }
    }

    /// Attach a listener that only sees events of one kind.
    pub fn on_kind<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&RouterEvent) + Send + Sync + 'static,
    {
        self.on(move |event: &RouterEvent| {
            if event.kind() == kind {
                listener(event);
            }
        })
    }

    /// Receive every event reaching this node asynchronously.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.node.sender.subscribe()
    }

    /// Number of attached synchronous listeners.
    pub fn listener_count(&self) -> usize {
        self.node
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Registration of a listener on one node.
///
/// Dropping the subscription leaves the listener attached; call
/// [`cancel`](Self::cancel) to remove it.
#[derive(Debug)]
pub struct Subscription {
    node: Weak<Node>,
    id: u64,
}

impl Subscription {
    /// Detach the listener.
    pub fn cancel(self) {
        if let Some(node) = self.node.upgrade() {
            node.listeners
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").finish_non_exhaustive()
    }
}
