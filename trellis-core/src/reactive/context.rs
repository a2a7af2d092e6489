//! Active-Computation Stack
//!
//! Tracks which computation is currently evaluating. This enables automatic
//! dependency tracking: when a cell is read, it can register the current
//! computation as a dependent without any manual subscription.
//!
//! # Implementation
//!
//! A thread-local stack holds one entry per in-flight evaluation. The top
//! entry is the "current" computation; `None` entries mark untracked
//! regions where reads should register nothing. Pushing returns a guard
//! that pops on drop, so push/pop pairing holds on every exit path,
//! including early `?` returns and unwinding.
//!
//! Nested evaluation (a computed value read during a render) simply pushes
//! a second entry; after the inner evaluation completes, the outer
//! computation is current again.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::subscriber::Subscriber;

thread_local! {
    static STACK: RefCell<Vec<Option<Weak<dyn Subscriber>>>> = const { RefCell::new(Vec::new()) };
}

/// Get the currently evaluating computation, if any.
///
/// Returns `None` when the stack is empty, when the top entry is an
/// untracked marker, or when the computation on top has been dropped.
pub(crate) fn current() -> Option<Rc<dyn Subscriber>> {
    STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .and_then(|top| top.as_ref())
            .and_then(Weak::upgrade)
    })
}

/// Check whether any evaluation is in flight on this thread.
pub fn is_tracking() -> bool {
    STACK.with(|stack| !stack.borrow().is_empty())
}

/// Run `f` with dependency tracking suspended.
///
/// Cell reads inside `f` register nothing, even when called from within a
/// computation's getter.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = TrackingGuard::push(None);
    f()
}

/// Guard that pops the stack when dropped.
pub(crate) struct TrackingGuard {
    _private: (),
}

impl TrackingGuard {
    /// Push `target` as the current computation (or `None` for an untracked
    /// region) and return the guard that restores the previous state.
    pub(crate) fn push(target: Option<Weak<dyn Subscriber>>) -> Self {
        STACK.with(|stack| stack.borrow_mut().push(target));
        Self { _private: () }
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert!(popped.is_some(), "tracking stack underflow");
        });
    }
}
