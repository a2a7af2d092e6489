//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on observable cells. Cells
//! talk to their subscribers exclusively through the [`Subscriber`] trait so
//! the cell side of the graph never needs to know the concrete value type a
//! computation produces.

use std::sync::atomic::{AtomicU64, Ordering};

use super::cell::ObservableCell;

/// Unique identifier for a computation.
///
/// Ids are handed out in creation order, which makes them usable as a
/// deterministic tie-break key when a batch of notifications must fire in
/// creation order (parent render computations before child ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComputationId(u64);

impl ComputationId {
    /// Generate a new unique computation ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ComputationId {
    fn default() -> Self {
        Self::new()
    }
}

/// The cell-facing surface of a computation.
///
/// Cells hold weak references to subscribers: the subscriber side owns the
/// relationship, and a torn-down computation disappears from a cell's list
/// without the cell needing to be told.
pub(crate) trait Subscriber {
    /// The computation's creation-order id.
    fn id(&self) -> ComputationId;

    /// Record that `cell` was read during the current evaluation.
    ///
    /// Called by [`ObservableCell::register_read`] while this subscriber is
    /// on top of the tracking stack.
    fn track(&self, cell: &ObservableCell);

    /// One of the cells this subscriber depends on was notified.
    fn on_dependency_changed(&self);
}
