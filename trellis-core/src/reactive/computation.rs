//! Reactive Computations
//!
//! A [`Computation`] is a unit of derived work: a render, a computed value,
//! or a user-registered watch. It evaluates a getter under the tracking
//! stack, auto-discovers which cells the getter read, and is re-invoked
//! when any of them notify.
//!
//! # Dependency generations
//!
//! Each computation keeps two generations of dependencies: the cells read
//! during the previous evaluation (`deps`) and the set being built during
//! the evaluation in progress (`new_deps`), each mirrored by an id set for
//! O(1) membership tests. After every evaluation the generations are
//! diffed: cells read last pass but not this pass drop this computation
//! from their subscriber list (stale pruning — essential for conditional
//! reads), then the generations swap and the new side is cleared for
//! reuse.
//!
//! # Flags
//!
//! - `lazy`: never recomputes eagerly; a notification only marks it dirty
//!   and the value refreshes on the next [`Computation::evaluate_if_dirty`].
//! - `sync`: recomputes inline when notified instead of going through the
//!   scheduler.
//! - `user`: getter and callback failures are reported through the error
//!   hook instead of propagating — a user watch survives its own errors.
//! - `deep`: after each evaluation the produced value is traversed so every
//!   nested cell registers a read, and the change callback fires even when
//!   the value compares equal.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::cell::{CellId, ObservableCell};
use super::context::TrackingGuard;
use super::scheduler::{Scheduler, Task};
use super::subscriber::{ComputationId, Subscriber};
use super::traverse::Traverse;
use crate::error::{self, Error};

/// The tracked function a computation evaluates.
pub type Getter<T> = Box<dyn Fn() -> Result<T, Error>>;

/// Change callback, invoked with `(new_value, old_value)`.
pub type ChangeCallback<T> = Box<dyn Fn(&T, Option<&T>) -> Result<(), Error>>;

/// Options controlling a computation's behavior.
pub struct WatchOptions {
    /// Traverse the produced value so nested cells register reads.
    pub deep: bool,
    /// Route getter/callback errors to the error hook instead of throwing.
    pub user: bool,
    /// Defer recomputation until the value is actually read.
    pub lazy: bool,
    /// Recompute inline on notification instead of via the scheduler.
    pub sync: bool,
    /// Pre-run hook, invoked by the scheduler before each batched re-run.
    pub before: Option<Box<dyn Fn()>>,
    /// Scheduler receiving batched re-runs. When absent, non-lazy
    /// notifications recompute inline as if `sync` were set.
    pub scheduler: Option<Rc<dyn Scheduler>>,
    /// Description used in diagnostics and error reports.
    pub description: Option<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            deep: false,
            user: false,
            lazy: false,
            sync: false,
            before: None,
            scheduler: None,
            description: None,
        }
    }
}

type DepList = SmallVec<[ObservableCell; 4]>;

struct ComputationInner<T> {
    id: ComputationId,
    weak_self: Weak<ComputationInner<T>>,
    description: String,

    getter: Getter<T>,
    callback: Option<ChangeCallback<T>>,
    before: Option<Box<dyn Fn()>>,
    scheduler: Option<Rc<dyn Scheduler>>,

    deep: bool,
    user: bool,
    lazy: bool,
    sync: bool,

    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    active: Cell<bool>,

    // Two dependency generations, in read order, with mirrored id sets.
    deps: RefCell<DepList>,
    new_deps: RefCell<DepList>,
    dep_ids: RefCell<HashSet<CellId>>,
    new_dep_ids: RefCell<HashSet<CellId>>,
}

impl<T> ComputationInner<T>
where
    T: Clone + PartialEq + Traverse + 'static,
{
    /// Evaluate the getter under tracking and reconcile dependencies.
    ///
    /// Returns `Ok(None)` when a `user` getter failed (reported, no new
    /// value this pass). Non-user failures propagate after the dependency
    /// reconciliation and stack pop have run.
    fn evaluate(&self) -> Result<Option<T>, Error> {
        let target: Weak<dyn Subscriber> = self.weak_self.clone();
        let guard = TrackingGuard::push(Some(target));

        let value = match (self.getter)() {
            Ok(value) => Some(value),
            Err(err) => {
                if self.user {
                    error::report(&err, &format!("getter for watcher \"{}\"", self.description));
                    None
                } else {
                    // Restore the stack and prune before propagating.
                    drop(guard);
                    self.cleanup_deps();
                    return Err(err);
                }
            }
        };

        if self.deep {
            // Touch everything reachable while still on the stack, so
            // nested cells subscribe this computation.
            if let Some(value) = &value {
                value.traverse();
            }
        }

        drop(guard);
        self.cleanup_deps();
        Ok(value)
    }

    /// Diff the two dependency generations, prune stale subscriptions,
    /// then swap and clear for the next pass.
    fn cleanup_deps(&self) {
        {
            let new_ids = self.new_dep_ids.borrow();
            for dep in self.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_subscriber(self.id);
                }
            }
        }
        self.dep_ids.swap(&self.new_dep_ids);
        self.new_dep_ids.borrow_mut().clear();
        self.deps.swap(&self.new_deps);
        self.new_deps.borrow_mut().clear();
    }

    /// Re-evaluate and fire the change callback when the value moved.
    fn run(&self) -> Result<(), Error> {
        if !self.active.get() {
            return Ok(());
        }

        let Some(value) = self.evaluate()? else {
            // User getter failed; keep the previous value.
            return Ok(());
        };

        let old_value = { self.value.borrow_mut().replace(value.clone()) };
        let moved = match &old_value {
            Some(old) => *old != value,
            None => true,
        };

        // Structural values and deep watches fire even when the comparison
        // says "unchanged": the value may have mutated in place.
        if moved || T::STRUCTURAL || self.deep {
            if let Some(callback) = &self.callback {
                if let Err(err) = callback(&value, old_value.as_ref()) {
                    if self.user {
                        error::report(
                            &err,
                            &format!("callback for watcher \"{}\"", self.description),
                        );
                    } else {
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }
}

impl<T> Subscriber for ComputationInner<T>
where
    T: Clone + PartialEq + Traverse + 'static,
{
    fn id(&self) -> ComputationId {
        self.id
    }

    fn track(&self, cell: &ObservableCell) {
        let cell_id = cell.id();
        if !self.new_dep_ids.borrow().contains(&cell_id) {
            self.new_dep_ids.borrow_mut().insert(cell_id);
            self.new_deps.borrow_mut().push(cell.clone());
            // Only subscribe if the previous generation didn't already:
            // re-reading the same cell across passes must not duplicate
            // the subscription.
            if !self.dep_ids.borrow().contains(&cell_id) {
                let weak: Weak<dyn Subscriber> = self.weak_self.clone();
                cell.add_subscriber(self.id, weak);
            }
        }
    }

    fn on_dependency_changed(&self) {
        if self.lazy {
            self.dirty.set(true);
        } else if self.sync || self.scheduler.is_none() {
            if let Err(err) = self.run() {
                // Nothing above a synchronous notification can catch this.
                error::report(&err, &format!("watcher \"{}\"", self.description));
            }
        } else if let (Some(scheduler), Some(this)) = (&self.scheduler, self.weak_self.upgrade()) {
            let task: Rc<dyn Task> = this;
            scheduler.enqueue(task);
        }
    }
}

impl<T> Task for ComputationInner<T>
where
    T: Clone + PartialEq + Traverse + 'static,
{
    fn id(&self) -> ComputationId {
        self.id
    }

    fn before(&self) {
        if let Some(before) = &self.before {
            before();
        }
    }

    fn run(&self) -> Result<(), Error> {
        ComputationInner::run(self)
    }

    fn description(&self) -> String {
        format!("watcher \"{}\"", self.description)
    }
}

/// A unit of derived work that auto-tracks its read-set and re-runs on
/// change. Cloning produces another handle to the same computation.
pub struct Computation<T>
where
    T: Clone + PartialEq + Traverse + 'static,
{
    inner: Rc<ComputationInner<T>>,
}

impl<T> Computation<T>
where
    T: Clone + PartialEq + Traverse + 'static,
{
    /// Register a computation over `getter`.
    ///
    /// Unless `lazy`, the getter is evaluated immediately to establish the
    /// initial dependency set; a non-user getter failure during that
    /// evaluation is returned. Lazy computations start dirty with no value.
    pub fn new(
        getter: impl Fn() -> Result<T, Error> + 'static,
        callback: Option<ChangeCallback<T>>,
        options: WatchOptions,
    ) -> Result<Self, Error> {
        let WatchOptions {
            deep,
            user,
            lazy,
            sync,
            before,
            scheduler,
            description,
        } = options;

        let id = ComputationId::new();
        let description =
            description.unwrap_or_else(|| format!("computation {}", id.raw()));

        let inner = Rc::new_cyclic(|weak| ComputationInner {
            id,
            weak_self: weak.clone(),
            description,
            getter: Box::new(getter),
            callback,
            before,
            scheduler,
            deep,
            user,
            lazy,
            sync,
            value: RefCell::new(None),
            dirty: Cell::new(lazy),
            active: Cell::new(true),
            deps: RefCell::new(DepList::new()),
            new_deps: RefCell::new(DepList::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
        });

        let computation = Self { inner };
        if !lazy {
            let value = computation.inner.evaluate()?;
            *computation.inner.value.borrow_mut() = value;
        }
        Ok(computation)
    }

    /// The computation's creation-order id.
    pub fn id(&self) -> ComputationId {
        self.inner.id
    }

    /// Clone of the last computed value, `None` if never computed.
    pub fn value(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// Whether a lazy computation has a pending recomputation.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Whether the computation still receives notifications.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Number of cells in the current dependency generation.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// Re-evaluate now and fire the change callback if the value moved.
    pub fn run(&self) -> Result<(), Error> {
        self.inner.run()
    }

    /// Recompute a lazy computation's value if it was marked dirty.
    pub fn evaluate_if_dirty(&self) -> Result<(), Error> {
        if self.inner.dirty.get() {
            let value = self.inner.evaluate()?;
            if value.is_some() {
                *self.inner.value.borrow_mut() = value;
            }
            self.inner.dirty.set(false);
        }
        Ok(())
    }

    /// Re-register the currently evaluating computation on every cell this
    /// one depends on.
    ///
    /// Used for computed-value chains: when computation X reads a lazy
    /// computed value Y, Y calls `depend_on_all` so X subscribes to Y's
    /// dependencies directly.
    pub fn depend_on_all(&self) {
        for dep in self.inner.deps.borrow().iter() {
            dep.register_read();
        }
    }

    /// Unsubscribe from every dependency cell and stop receiving
    /// notifications. Idempotent.
    pub fn teardown(&self) {
        if self.inner.active.get() {
            for dep in self.inner.deps.borrow().iter() {
                dep.remove_subscriber(self.inner.id);
            }
            self.inner.active.set(false);
        }
    }
}

impl<T> Clone for Computation<T>
where
    T: Clone + PartialEq + Traverse + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computation<T>
where
    T: Clone + PartialEq + Traverse + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.inner.id)
            .field("description", &self.inner.description)
            .field("active", &self.inner.active.get())
            .field("dirty", &self.inner.dirty.get())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}
