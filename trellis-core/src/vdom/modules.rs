//! Hook Modules
//!
//! Cross-cutting node behaviors (attributes, classes, styles, event
//! listeners, transitions) plug into the reconciler as [`Module`]s. Each
//! module contributes callbacks for the lifecycle phases it cares about;
//! the patcher aggregates them per phase at construction time and fires
//! every registered callback at the corresponding point of a patch.

use std::cell::Cell;
use std::rc::Rc;

use super::vnode::VNode;

pub type CreateHook<N> = Box<dyn Fn(Option<&VNode<N>>, &VNode<N>)>;
pub type UpdateHook<N> = Box<dyn Fn(&VNode<N>, &VNode<N>)>;
pub type DestroyHook<N> = Box<dyn Fn(&VNode<N>)>;
pub type RemoveHook<N> = Box<dyn Fn(&VNode<N>, &Rc<RemoveHandle>)>;

/// One cross-cutting behavior, phase by phase.
pub struct Module<N: Clone> {
    pub name: &'static str,
    /// After a host node is created for a vnode, before insertion.
    pub create: Option<CreateHook<N>>,
    /// A kept-alive component instance was re-attached.
    pub activate: Option<CreateHook<N>>,
    /// An existing host node is being patched in place.
    pub update: Option<UpdateHook<N>>,
    /// A host node is about to be removed; call `handle.done()` to let
    /// the removal proceed.
    pub remove: Option<RemoveHook<N>>,
    /// A vnode's subtree is being torn down.
    pub destroy: Option<DestroyHook<N>>,
}

impl<N: Clone> Default for Module<N> {
    fn default() -> Self {
        Self {
            name: "",
            create: None,
            activate: None,
            update: None,
            remove: None,
            destroy: None,
        }
    }
}

/// Countdown gate for a deferred host-node removal.
///
/// Every remove listener (each module remove callback, plus the vnode's
/// own remove hook or a synthetic final listener) must call [`done`].
/// The host node detaches when the last listener has reported in, which
/// lets leave transitions finish before the node disappears.
///
/// [`done`]: RemoveHandle::done
pub struct RemoveHandle {
    listeners: Cell<usize>,
    finish: Box<dyn Fn()>,
}

impl RemoveHandle {
    pub(crate) fn new(listeners: usize, finish: Box<dyn Fn()>) -> Rc<Self> {
        Rc::new(Self {
            listeners: Cell::new(listeners),
            finish,
        })
    }

    /// Extra listeners picked up while descending into a component root.
    pub(crate) fn add_listeners(&self, extra: usize) {
        self.listeners.set(self.listeners.get() + extra);
    }

    /// Report one listener finished. The final call performs the removal.
    pub fn done(&self) {
        let remaining = self.listeners.get().saturating_sub(1);
        self.listeners.set(remaining);
        if remaining == 0 {
            (self.finish)();
        }
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.listeners.get()
    }
}
