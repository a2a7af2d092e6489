//! Observable Cells
//!
//! An [`ObservableCell`] is the fundamental observable unit. It holds no
//! value itself; it tracks which computations currently depend on one slot
//! of observed state. A state layer built on this crate pairs each observed
//! slot with a cell, calling [`ObservableCell::register_read`] from the
//! slot's getter and [`ObservableCell::notify`] from its setter.
//!
//! # Subscriber management
//!
//! The subscriber collection is insertion-ordered with at most one entry
//! per computation, and holds only weak references: cells never keep a
//! torn-down computation alive. The relationship is many-to-many — a cell
//! can have any number of subscribers, and a computation any number of
//! dependency cells.
//!
//! # Notification ordering
//!
//! `notify` snapshots the subscriber list before firing, so a subscriber
//! that mutates the list mid-notification (tearing a watch down from inside
//! a callback) cannot skip or double-fire anyone. In synchronous mode
//! (`config.batched_notify == false`) the snapshot is additionally sorted
//! by computation id, guaranteeing deterministic creation-order firing when
//! no external scheduler re-orders batches.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::context;
use super::subscriber::{ComputationId, Subscriber};
use crate::config;

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique, monotonic identifier for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        Self(CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct CellInner {
    id: CellId,
    subscribers: RefCell<IndexMap<ComputationId, Weak<dyn Subscriber>>>,
}

/// A single observable slot: tracks subscribers, not values.
///
/// Cloning produces another handle to the same cell.
pub struct ObservableCell {
    inner: Rc<CellInner>,
}

impl ObservableCell {
    /// Create a new cell with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(CellInner {
                id: CellId::next(),
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// The cell's unique ID.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Register a subscriber. No-op if it is already present.
    pub(crate) fn add_subscriber(&self, id: ComputationId, subscriber: Weak<dyn Subscriber>) {
        self.inner
            .subscribers
            .borrow_mut()
            .entry(id)
            .or_insert(subscriber);
    }

    /// Remove a subscriber. No-op if absent.
    pub(crate) fn remove_subscriber(&self, id: ComputationId) {
        self.inner.subscribers.borrow_mut().shift_remove(&id);
    }

    /// Record a read of the observed slot this cell guards.
    ///
    /// If a computation is currently evaluating, it tracks this cell as a
    /// dependency; otherwise this is a no-op.
    pub fn register_read(&self) {
        if let Some(subscriber) = context::current() {
            subscriber.track(self);
        }
    }

    /// Notify every subscribed computation that the observed slot changed.
    pub fn notify(&self) {
        // Drop entries whose computation is gone, then snapshot so that
        // subscribers may mutate the collection mid-notification.
        let mut snapshot: Vec<(ComputationId, Weak<dyn Subscriber>)> = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            subscribers.retain(|_, weak| weak.strong_count() > 0);
            subscribers
                .iter()
                .map(|(id, weak)| (*id, weak.clone()))
                .collect()
        };
        if !config::get().batched_notify {
            // Subscribers aren't sorted by the scheduler in synchronous
            // mode, so sort here to fire in creation order.
            snapshot.sort_by_key(|(id, _)| *id);
        }

        for (_, weak) in snapshot {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.on_dependency_changed();
            }
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let subscribers = self.inner.subscribers.borrow();
        subscribers
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Whether `id` is currently subscribed. Used by tests and diagnostics.
    pub fn has_subscriber(&self, id: ComputationId) -> bool {
        self.inner.subscribers.borrow().contains_key(&id)
    }
}

impl Clone for ObservableCell {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for ObservableCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Cells compare by identity: two handles are equal iff they are handles
/// to the same cell.
impl PartialEq for ObservableCell {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ObservableCell {}

impl Debug for ObservableCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableCell")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
