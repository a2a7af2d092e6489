//! Tree Reconciliation
//!
//! [`Patcher`] diffs a new virtual tree against the previous one and
//! applies the minimal set of host mutations to make the rendered output
//! match. The algorithm is recursive: two nodes that describe the same
//! thing (see [`same_vnode`]) are patched in place, anything else is
//! replaced wholesale.
//!
//! Keyed children reconcile through a four-pointer scan over both child
//! lists. The common cases (stable prefix/suffix, a list reversed or
//! shifted by one) resolve without touching a key map; only when all four
//! checks miss does the scan fall back to a lazily built key index.
//!
//! Insert hooks do not fire as nodes are created. Each pass collects the
//! vnodes that want one into a queue and flushes it only after the tree
//! is actually attached, so a hook always observes its node in the live
//! host tree. A component subtree patched before its placeholder is
//! attached parks its queue on the placeholder's `pending_insert` slot
//! instead; the placeholder's own materialization picks it up.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::config;
use crate::vdom::backend::Backend;
use crate::vdom::modules::{
    CreateHook, DestroyHook, Module, RemoveHandle, RemoveHook, UpdateHook,
};
use crate::vdom::vnode::{Key, Kind, VNode};

/// Input subtypes that reuse the same host node when the `type` attribute
/// changes between them.
const TEXT_INPUT_TYPES: &[&str] = &[
    "text", "number", "password", "search", "email", "tel", "url",
];

fn is_text_input(ty: Option<&str>) -> bool {
    ty.is_some_and(|ty| TEXT_INPUT_TYPES.contains(&ty))
}

fn same_input_type<N: Clone>(a: &VNode<N>, b: &VNode<N>) -> bool {
    if a.kind().tag() != Some("input") {
        return true;
    }
    let type_of =
        |vnode: &VNode<N>| vnode.data().and_then(|data| data.attrs.get("type").cloned());
    let type_a = type_of(a);
    let type_b = type_of(b);
    type_a == type_b || (is_text_input(type_a.as_deref()) && is_text_input(type_b.as_deref()))
}

fn kinds_match(a: &Kind, b: &Kind) -> bool {
    match (a, b) {
        (Kind::Element(x), Kind::Element(y)) => x == y,
        (Kind::Component(x), Kind::Component(y)) => x == y,
        (Kind::Text, Kind::Text) => true,
        (x, y) => x.is_comment_like() && y.is_comment_like(),
    }
}

fn same_async_factory<N: Clone>(a: &VNode<N>, b: &VNode<N>) -> bool {
    match (a.async_factory(), b.async_factory()) {
        (None, None) => true,
        (Some(x), Some(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// Whether `b` may be patched onto the host node `a` produced, instead of
/// replacing it.
pub fn same_vnode<N: Clone>(a: &VNode<N>, b: &VNode<N>) -> bool {
    if a.key() != b.key() || !same_async_factory(a, b) {
        return false;
    }
    let structurally_same = kinds_match(a.kind(), b.kind())
        && a.data().is_some() == b.data().is_some()
        && same_input_type(a, b);
    let placeholder_resolving = a.is_async_placeholder()
        && b.async_factory().is_some_and(|factory| !factory.has_error());
    structurally_same || placeholder_resolving
}

fn check_duplicate_keys<N: Clone>(children: &[VNode<N>]) {
    if !config::get().dev_warnings {
        return;
    }
    let mut seen: HashSet<&Key> = HashSet::new();
    for child in children {
        if let Some(key) = child.key() {
            if !seen.insert(key) {
                tracing::warn!(
                    key = ?key,
                    "duplicate key among siblings, reconciliation may misbehave"
                );
            }
        }
    }
}

fn find_unkeyed<N: Clone>(
    old_children: &[Option<VNode<N>>],
    start: isize,
    end: isize,
    node: &VNode<N>,
) -> Option<isize> {
    (start..end).find(|&index| {
        old_children[index as usize]
            .as_ref()
            .is_some_and(|old| same_vnode(old, node))
    })
}

pub(super) struct PhaseCallbacks<N: Clone> {
    pub(super) create: Vec<CreateHook<N>>,
    pub(super) activate: Vec<CreateHook<N>>,
    pub(super) update: Vec<UpdateHook<N>>,
    pub(super) remove: Vec<RemoveHook<N>>,
    pub(super) destroy: Vec<DestroyHook<N>>,
}

struct DepthGuard<'a>(&'a Cell<u32>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// The reconciler, bound to one [`Backend`] and a set of hook modules.
pub struct Patcher<B: Backend> {
    pub(super) backend: Rc<B>,
    pub(super) cbs: PhaseCallbacks<B::Node>,
    raw_depth: Cell<u32>,
    pub(super) hydration_bailed: Cell<bool>,
}

impl<B: Backend> Patcher<B> {
    pub fn new(backend: B, modules: Vec<Module<B::Node>>) -> Self {
        let mut cbs = PhaseCallbacks {
            create: Vec::new(),
            activate: Vec::new(),
            update: Vec::new(),
            remove: Vec::new(),
            destroy: Vec::new(),
        };
        for module in modules {
            if let Some(hook) = module.create {
                cbs.create.push(hook);
            }
            if let Some(hook) = module.activate {
                cbs.activate.push(hook);
            }
            if let Some(hook) = module.update {
                cbs.update.push(hook);
            }
            if let Some(hook) = module.remove {
                cbs.remove.push(hook);
            }
            if let Some(hook) = module.destroy {
                cbs.destroy.push(hook);
            }
        }
        Self {
            backend: Rc::new(backend),
            cbs,
            raw_depth: Cell::new(0),
            hydration_bailed: Cell::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Diff `new` against `old` and apply the difference.
    ///
    /// With no `old` the tree is materialized detached (the caller
    /// attaches the returned host node). With no `new` the old tree is
    /// torn down. `remove_only` suppresses in-place child moves on the
    /// root's own children, for callers animating a list transition.
    ///
    /// Returns the host node now backing the tree root.
    pub fn patch(
        &self,
        old: Option<&VNode<B::Node>>,
        new: Option<&VNode<B::Node>>,
        remove_only: bool,
    ) -> Option<B::Node> {
        let Some(new) = new else {
            if let Some(old) = old {
                self.invoke_destroy_hook(old);
                self.remove_and_invoke_remove_hook(old, None);
            }
            return None;
        };

        let mut queue = Vec::new();
        let mut initial = false;
        match old {
            None => {
                initial = true;
                self.create_node(new, &mut queue, None, None, None);
            }
            Some(old) if same_vnode(old, new) => {
                self.patch_vnode(old, new, &mut queue, None, remove_only);
            }
            Some(old) => self.replace_root(old, new, &mut queue),
        }

        self.invoke_insert_hook(new, queue, initial);
        new.host()
    }

    /// Render `vnode` into the existing host element `root`, replacing
    /// it. With `hydrating` the pre-rendered content under `root` is
    /// adopted instead, falling back to a full render on mismatch.
    pub fn mount(&self, root: &B::Node, vnode: &VNode<B::Node>, hydrating: bool) -> Option<B::Node> {
        let mut queue = Vec::new();
        if hydrating {
            if self.hydrate(root, vnode, &mut queue) {
                self.invoke_insert_hook(vnode, queue, true);
                return vnode.host();
            }
            if config::get().dev_warnings && !self.hydration_bailed.replace(true) {
                tracing::warn!(
                    "pre-rendered content does not match the virtual tree, \
                     performing full client-side render"
                );
            }
        }

        let old = self.wrap_host(root);
        self.replace_root(&old, vnode, &mut queue);
        self.invoke_insert_hook(vnode, queue, false);
        vnode.host()
    }

    fn wrap_host(&self, host: &B::Node) -> VNode<B::Node> {
        let tag = self.backend.tag_name(host).unwrap_or_default();
        let vnode = VNode::build(
            Kind::Element(tag),
            None,
            None,
            Vec::new(),
            None,
            None,
            false,
            false,
            None,
        );
        vnode.set_host(Some(host.clone()));
        vnode
    }

    fn replace_root(
        &self,
        old: &VNode<B::Node>,
        new: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
    ) {
        let old_host = old.host();
        let parent = old_host
            .as_ref()
            .and_then(|host| self.backend.parent_node(host));
        let reference = old_host
            .as_ref()
            .and_then(|host| self.backend.next_sibling(host));

        self.create_node(new, queue, parent.as_ref(), reference.as_ref(), None);

        // The root of a component tree may sit behind a chain of
        // placeholder vnodes held by enclosing components. Each of them
        // still points at the replaced host node; walk the chain and
        // update it.
        if new.parent().is_some() {
            let patchable = self.is_patchable(new);
            let mut ancestor = new.parent();
            while let Some(current) = ancestor {
                for destroy in &self.cbs.destroy {
                    destroy(&current);
                }
                current.set_host(new.host());
                if patchable {
                    for create in &self.cbs.create {
                        create(None, &current);
                    }
                    if let Some(hook) = current.hook() {
                        if let Some(create) = &hook.create {
                            create(None, &current);
                        }
                    }
                }
                ancestor = current.parent();
            }
        }

        if parent.is_some() {
            self.remove_vnode(old);
        } else if matches!(old.kind(), Kind::Element(_) | Kind::Component(_)) {
            self.invoke_destroy_hook(old);
        }
    }

    /// Materialize `vnode`, producing its host node and inserting it
    /// under `parent` before `reference`.
    ///
    /// A vnode that already carries a host reference is being reused as a
    /// new description; when it sits in an owner list it is cloned first
    /// and the clone takes its slot. Returns the vnode actually
    /// materialized.
    fn create_node(
        &self,
        vnode: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
        parent: Option<&B::Node>,
        reference: Option<&B::Node>,
        owner: Option<(&VNode<B::Node>, usize)>,
    ) -> VNode<B::Node> {
        let vnode = if vnode.host().is_some() && owner.is_some() {
            let cloned = vnode.clone_node();
            if let Some((owner_vnode, index)) = owner {
                owner_vnode.replace_child(index, cloned.clone());
            }
            cloned
        } else {
            vnode.clone()
        };

        if self.create_component(&vnode, queue, parent, reference) {
            return vnode;
        }

        match vnode.kind() {
            Kind::Element(tag) => {
                let raw = vnode.data().is_some_and(|data| data.pre);
                let _raw_guard = raw.then(|| DepthGuard::enter(&self.raw_depth));
                if config::get().dev_warnings
                    && self.raw_depth.get() == 0
                    && vnode.ns().is_none()
                    && !self.backend.is_known_element(tag)
                {
                    tracing::warn!(tag = %tag, "unknown element type in virtual tree");
                }

                let host = match vnode.ns() {
                    Some(ns) => self.backend.create_element_ns(ns, tag),
                    None => self.backend.create_element(tag),
                };
                vnode.set_host(Some(host.clone()));
                self.set_scope(&vnode);
                self.create_children(&vnode, queue);
                if vnode.data().is_some() {
                    self.invoke_create_hooks(&vnode, queue);
                }
                self.insert(parent, &host, reference);
            }
            Kind::Component(name) => {
                // the init hook produced no instance
                if config::get().dev_warnings {
                    tracing::warn!(component = %name, "component produced no instance");
                }
                let host = self.backend.create_comment("");
                vnode.set_host(Some(host.clone()));
                self.insert(parent, &host, reference);
            }
            Kind::Text => {
                let host = self.backend.create_text(vnode.text().unwrap_or(""));
                vnode.set_host(Some(host.clone()));
                self.insert(parent, &host, reference);
            }
            Kind::Comment | Kind::Empty | Kind::AsyncPlaceholder => {
                let host = self.backend.create_comment(vnode.text().unwrap_or(""));
                vnode.set_host(Some(host.clone()));
                self.insert(parent, &host, reference);
            }
        }
        vnode
    }

    /// Give a component vnode's init hook the chance to mount an
    /// instance. Returns `true` when the vnode materialized through one.
    fn create_component(
        &self,
        vnode: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
        parent: Option<&B::Node>,
        reference: Option<&B::Node>,
    ) -> bool {
        let Some(data) = vnode.data() else {
            return false;
        };
        let reactivated = vnode.component_root().is_some() && data.keep_alive;
        if let Some(hook) = &data.hook {
            if let Some(init) = &hook.init {
                init(vnode, false);
            }
        }
        if vnode.component_root().is_none() {
            return false;
        }

        self.init_component(vnode, queue);
        if let Some(host) = vnode.host() {
            self.insert(parent, &host, reference);
        }
        if reactivated {
            self.reactivate_component(vnode, queue, parent, reference);
        }
        true
    }

    pub(super) fn init_component(
        &self,
        vnode: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
    ) {
        if let Some(data) = vnode.data() {
            queue.append(&mut data.pending_insert.borrow_mut());
        }
        if let Some(root) = vnode.component_root() {
            vnode.set_host(root.host());
        }
        if self.is_patchable(vnode) {
            self.invoke_create_hooks(vnode, queue);
            self.set_scope(vnode);
        } else {
            // empty component root: still register for the insert phase
            queue.push(vnode.clone());
        }
    }

    /// A kept-alive instance came back: fire activate hooks on its inner
    /// root and re-queue it for the insert phase.
    fn reactivate_component(
        &self,
        vnode: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
        parent: Option<&B::Node>,
        reference: Option<&B::Node>,
    ) {
        let mut inner = vnode.clone();
        while let Some(root) = inner.component_root() {
            inner = root;
        }
        for activate in &self.cbs.activate {
            activate(None, &inner);
        }
        queue.push(inner);
        if let Some(host) = vnode.host() {
            self.insert(parent, &host, reference);
        }
    }

    fn insert(&self, parent: Option<&B::Node>, node: &B::Node, reference: Option<&B::Node>) {
        let Some(parent) = parent else {
            return;
        };
        match reference {
            Some(reference) => {
                // the reference may have been detached by a concurrent removal
                if self.backend.parent_node(reference).as_ref() == Some(parent) {
                    self.backend.insert_before(parent, node, reference);
                }
            }
            None => self.backend.append_child(parent, node),
        }
    }

    pub(super) fn create_children(
        &self,
        vnode: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
    ) {
        let children = vnode.children();
        if !children.is_empty() {
            check_duplicate_keys(&children);
            let host = vnode.host();
            for (index, child) in children.iter().enumerate() {
                self.create_node(child, queue, host.as_ref(), None, Some((vnode, index)));
            }
        } else if let (Kind::Element(_), Some(text)) = (vnode.kind(), vnode.text()) {
            if let Some(host) = vnode.host() {
                let node = self.backend.create_text(text);
                self.backend.append_child(&host, &node);
            }
        }
    }

    pub(super) fn invoke_create_hooks(
        &self,
        vnode: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
    ) {
        for create in &self.cbs.create {
            create(None, vnode);
        }
        if let Some(hook) = vnode.hook() {
            if let Some(create) = &hook.create {
                create(None, vnode);
            }
            if hook.insert.is_some() {
                queue.push(vnode.clone());
            }
        }
    }

    /// Apply this vnode's scoped-style id, plus those of every enclosing
    /// placeholder, to the host node.
    fn set_scope(&self, vnode: &VNode<B::Node>) {
        let Some(host) = vnode.host() else {
            return;
        };
        if let Some(scope) = vnode.data().and_then(|data| data.scope_id.clone()) {
            self.backend.set_scope_attribute(&host, &scope);
        }
        let mut ancestor = vnode.parent();
        while let Some(current) = ancestor {
            if let Some(scope) = current.data().and_then(|data| data.scope_id.clone()) {
                self.backend.set_scope_attribute(&host, &scope);
            }
            ancestor = current.parent();
        }
    }

    pub(super) fn is_patchable(&self, vnode: &VNode<B::Node>) -> bool {
        let mut current = vnode.clone();
        while let Some(root) = current.component_root() {
            current = root;
        }
        matches!(current.kind(), Kind::Element(_))
    }

    /// Patch `new` onto the host node produced by `old`. The two must
    /// satisfy [`same_vnode`]. Returns the vnode that now owns the host
    /// reference (a clone of `new` if it had to be defensively copied).
    fn patch_vnode(
        &self,
        old: &VNode<B::Node>,
        new: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
        owner: Option<(&VNode<B::Node>, usize)>,
        remove_only: bool,
    ) -> VNode<B::Node> {
        if old.same_instance(new) {
            return new.clone();
        }

        let new = if new.host().is_some() && owner.is_some() {
            let cloned = new.clone_node();
            if let Some((owner_vnode, index)) = owner {
                owner_vnode.replace_child(index, cloned.clone());
            }
            cloned
        } else {
            new.clone()
        };

        let Some(host) = old.host() else {
            return new;
        };
        new.set_host(Some(host.clone()));

        if old.is_async_placeholder() {
            match new.async_factory() {
                Some(factory) if factory.resolved().is_some() => {
                    self.hydrate(&host, &new, queue);
                }
                _ => new.set_async_placeholder(true),
            }
            return new;
        }

        // A static tree reappearing via clone (or a render-once tree) is
        // known unchanged; adopt the old instance's state wholesale.
        if old.is_static()
            && new.is_static()
            && old.key() == new.key()
            && (new.is_cloned() || new.is_once())
        {
            new.set_component_root(old.component_root());
            return new;
        }

        if let Some(hook) = new.hook() {
            if let Some(prepatch) = &hook.prepatch {
                prepatch(old, &new);
            }
        }

        let patchable = self.is_patchable(&new);
        if patchable && new.data().is_some() {
            for update in &self.cbs.update {
                update(old, &new);
            }
            if let Some(hook) = new.hook() {
                if let Some(update) = &hook.update {
                    update(old, &new);
                }
            }
        }

        if new.text().is_none() {
            match (old.has_children(), new.has_children()) {
                (true, true) => {
                    if !old.identical_children(&new) {
                        self.update_children(&host, old, &new, queue, remove_only);
                    }
                }
                (false, true) => {
                    check_duplicate_keys(&new.children());
                    if old.text().is_some() {
                        self.backend.set_text_content(&host, "");
                    }
                    let children = new.children();
                    for (index, child) in children.iter().enumerate() {
                        self.create_node(child, queue, Some(&host), None, Some((&new, index)));
                    }
                }
                (true, false) => {
                    for child in old.children() {
                        self.remove_vnode(&child);
                    }
                }
                (false, false) => {
                    if old.text().is_some() {
                        self.backend.set_text_content(&host, "");
                    }
                }
            }
        } else if old.text() != new.text() {
            if let Some(text) = new.text() {
                self.backend.set_text_content(&host, text);
            }
        }

        if let Some(hook) = new.hook() {
            if let Some(postpatch) = &hook.postpatch {
                postpatch(old, &new);
            }
        }
        new
    }

    fn update_children(
        &self,
        parent_host: &B::Node,
        old_parent: &VNode<B::Node>,
        new_parent: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
        remove_only: bool,
    ) {
        // Consumed old slots are nulled rather than removed so the scan
        // indices stay stable.
        let mut old_ch: Vec<Option<VNode<B::Node>>> =
            old_parent.children().into_iter().map(Some).collect();
        let mut new_ch: Vec<VNode<B::Node>> = new_parent.children();

        check_duplicate_keys(&new_ch);

        let can_move = !remove_only;
        let mut old_start = 0isize;
        let mut old_end = old_ch.len() as isize - 1;
        let mut new_start = 0isize;
        let mut new_end = new_ch.len() as isize - 1;
        let mut key_index: Option<HashMap<Key, isize>> = None;

        while old_start <= old_end && new_start <= new_end {
            let Some(old_s) = old_ch[old_start as usize].clone() else {
                old_start += 1;
                continue;
            };
            let Some(old_e) = old_ch[old_end as usize].clone() else {
                old_end -= 1;
                continue;
            };

            if same_vnode(&old_s, &new_ch[new_start as usize]) {
                let effective = self.patch_vnode(
                    &old_s,
                    &new_ch[new_start as usize].clone(),
                    queue,
                    Some((new_parent, new_start as usize)),
                    false,
                );
                new_ch[new_start as usize] = effective;
                old_start += 1;
                new_start += 1;
            } else if same_vnode(&old_e, &new_ch[new_end as usize]) {
                let effective = self.patch_vnode(
                    &old_e,
                    &new_ch[new_end as usize].clone(),
                    queue,
                    Some((new_parent, new_end as usize)),
                    false,
                );
                new_ch[new_end as usize] = effective;
                old_end -= 1;
                new_end -= 1;
            } else if same_vnode(&old_s, &new_ch[new_end as usize]) {
                // old head moved toward the tail
                let effective = self.patch_vnode(
                    &old_s,
                    &new_ch[new_end as usize].clone(),
                    queue,
                    Some((new_parent, new_end as usize)),
                    false,
                );
                new_ch[new_end as usize] = effective;
                if can_move {
                    if let Some(host) = old_s.host() {
                        let reference =
                            old_e.host().and_then(|h| self.backend.next_sibling(&h));
                        self.insert(Some(parent_host), &host, reference.as_ref());
                    }
                }
                old_start += 1;
                new_end -= 1;
            } else if same_vnode(&old_e, &new_ch[new_start as usize]) {
                // old tail moved toward the head
                let effective = self.patch_vnode(
                    &old_e,
                    &new_ch[new_start as usize].clone(),
                    queue,
                    Some((new_parent, new_start as usize)),
                    false,
                );
                new_ch[new_start as usize] = effective;
                if can_move {
                    if let (Some(host), Some(reference)) = (old_e.host(), old_s.host()) {
                        self.insert(Some(parent_host), &host, Some(&reference));
                    }
                }
                old_end -= 1;
                new_start += 1;
            } else {
                let key_index = key_index.get_or_insert_with(|| {
                    let mut map = HashMap::new();
                    for index in old_start..=old_end {
                        if let Some(old) = &old_ch[index as usize] {
                            if let Some(key) = old.key() {
                                map.insert(key.clone(), index);
                            }
                        }
                    }
                    map
                });
                let new_node = new_ch[new_start as usize].clone();
                let found = match new_node.key() {
                    Some(key) => key_index.get(key).copied(),
                    None => find_unkeyed(&old_ch, old_start, old_end, &new_node),
                };
                let matched = found.and_then(|index| {
                    old_ch[index as usize].clone().map(|old| (index, old))
                });
                match matched {
                    Some((index, to_move)) if same_vnode(&to_move, &new_node) => {
                        let effective = self.patch_vnode(
                            &to_move,
                            &new_node,
                            queue,
                            Some((new_parent, new_start as usize)),
                            false,
                        );
                        new_ch[new_start as usize] = effective;
                        old_ch[index as usize] = None;
                        if can_move {
                            if let (Some(host), Some(reference)) =
                                (to_move.host(), old_s.host())
                            {
                                self.insert(Some(parent_host), &host, Some(&reference));
                            }
                        }
                    }
                    // same key, different node type: treat as new
                    _ => {
                        let effective = self.create_node(
                            &new_node,
                            queue,
                            Some(parent_host),
                            old_s.host().as_ref(),
                            Some((new_parent, new_start as usize)),
                        );
                        new_ch[new_start as usize] = effective;
                    }
                }
                new_start += 1;
            }
        }

        if old_start > old_end {
            // old children exhausted: the remainder of new are additions,
            // anchored before the node that follows the span
            let reference = new_ch
                .get((new_end + 1) as usize)
                .and_then(|after| after.host());
            for index in new_start..=new_end {
                let effective = self.create_node(
                    &new_ch[index as usize].clone(),
                    queue,
                    Some(parent_host),
                    reference.as_ref(),
                    Some((new_parent, index as usize)),
                );
                new_ch[index as usize] = effective;
            }
        } else if new_start > new_end {
            for index in old_start..=old_end {
                if let Some(old) = &old_ch[index as usize] {
                    self.remove_vnode(old);
                }
            }
        }
    }

    fn remove_vnode(&self, vnode: &VNode<B::Node>) {
        match vnode.kind() {
            Kind::Element(_) | Kind::Component(_) => {
                self.remove_and_invoke_remove_hook(vnode, None);
                self.invoke_destroy_hook(vnode);
            }
            _ => {
                if let Some(host) = vnode.host() {
                    self.remove_node(&host);
                }
            }
        }
    }

    fn remove_node(&self, host: &B::Node) {
        // the node may already have been detached
        if let Some(parent) = self.backend.parent_node(host) {
            self.backend.remove_child(&parent, host);
        }
    }

    /// Remove a host node once every remove listener has let go. With no
    /// listeners involved the removal is immediate.
    fn remove_and_invoke_remove_hook(
        &self,
        vnode: &VNode<B::Node>,
        handle: Option<Rc<RemoveHandle>>,
    ) {
        if handle.is_none() && vnode.data().is_none() {
            if let Some(host) = vnode.host() {
                self.remove_node(&host);
            }
            return;
        }

        let listeners = self.cbs.remove.len() + 1;
        let handle = match handle {
            // descending into a component root: the outer handle takes on
            // this level's listeners as well
            Some(handle) => {
                handle.add_listeners(listeners);
                handle
            }
            None => {
                let backend = Rc::clone(&self.backend);
                let host = vnode.host();
                RemoveHandle::new(
                    listeners,
                    Box::new(move || {
                        if let Some(host) = &host {
                            if let Some(parent) = backend.parent_node(host) {
                                backend.remove_child(&parent, host);
                            }
                        }
                    }),
                )
            }
        };

        if let Some(root) = vnode.component_root() {
            if root.data().is_some() {
                self.remove_and_invoke_remove_hook(&root, Some(Rc::clone(&handle)));
            }
        }
        for remove in &self.cbs.remove {
            remove(vnode, &handle);
        }
        match vnode.hook().filter(|hook| hook.remove.is_some()) {
            Some(hook) => {
                if let Some(remove) = &hook.remove {
                    remove(vnode, &handle);
                }
            }
            None => handle.done(),
        }
    }

    /// Tear down a subtree's hooks, children before parents.
    fn invoke_destroy_hook(&self, vnode: &VNode<B::Node>) {
        for child in vnode.children() {
            self.invoke_destroy_hook(&child);
        }
        if vnode.data().is_some() {
            if let Some(hook) = vnode.hook() {
                if let Some(destroy) = &hook.destroy {
                    destroy(vnode);
                }
            }
            for destroy in &self.cbs.destroy {
                destroy(vnode);
            }
        }
    }

    fn invoke_insert_hook(
        &self,
        vnode: &VNode<B::Node>,
        queue: Vec<VNode<B::Node>>,
        initial: bool,
    ) {
        // An initial patch of a component subtree defers its insert hooks
        // until the enclosing placeholder really attaches.
        if initial {
            if let Some(parent) = vnode.parent() {
                if let Some(data) = parent.data() {
                    *data.pending_insert.borrow_mut() = queue;
                    return;
                }
            }
        }
        for node in queue {
            if let Some(hook) = node.hook() {
                if let Some(insert) = &hook.insert {
                    insert(&node);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::element::element;
    use crate::vdom::memory::{MemoryBackend, MemoryNode};
    use crate::vdom::vnode::NodeHooks;
    use std::cell::RefCell;

    fn patcher() -> Patcher<MemoryBackend> {
        Patcher::new(MemoryBackend::new(), Vec::new())
    }

    fn keyed_list(keys: &[&str]) -> VNode<MemoryNode> {
        element("ul")
            .children(keys.iter().map(|key| {
                element("li").key(*key).text_child(*key).build()
            }))
            .build()
    }

    fn markup(vnode: &VNode<MemoryNode>) -> String {
        vnode.host().map(|host| host.to_markup()).unwrap_or_default()
    }

    #[test]
    fn fresh_mount_builds_the_host_tree() {
        let patcher = patcher();
        let tree = element("div")
            .attr("id", "app")
            .child(element("span").text_child("hi").build())
            .build();
        let host = patcher.patch(None, Some(&tree), false).unwrap();
        assert_eq!(host.to_markup(), "<div><span>hi</span></div>");
    }

    #[test]
    fn text_change_patches_in_place() {
        let patcher = patcher();
        let old = element("p").text_child("before").build();
        patcher.patch(None, Some(&old), false);
        patcher.backend().reset_stats();

        let new = element("p").text_child("after").build();
        patcher.patch(Some(&old), Some(&new), false);

        let stats = patcher.backend().stats();
        assert_eq!(stats.creates, 0, "same node must be reused");
        assert_eq!(stats.text_sets, 1);
        assert_eq!(markup(&new), "<p>after</p>");
    }

    #[test]
    fn unchanged_tree_touches_nothing() {
        let patcher = patcher();
        let old = keyed_list(&["a", "b", "c"]);
        patcher.patch(None, Some(&old), false);
        patcher.backend().reset_stats();

        let new = keyed_list(&["a", "b", "c"]);
        patcher.patch(Some(&old), Some(&new), false);
        assert_eq!(patcher.backend().stats(), crate::vdom::OpStats::default());
    }

    #[test]
    fn keyed_reorder_moves_instead_of_recreating() {
        let patcher = patcher();
        let old = keyed_list(&["a", "b", "c", "d"]);
        patcher.patch(None, Some(&old), false);
        patcher.backend().reset_stats();

        let new = keyed_list(&["d", "c", "b", "a"]);
        patcher.patch(Some(&old), Some(&new), false);

        let stats = patcher.backend().stats();
        assert_eq!(stats.creates, 0);
        assert!(stats.moves > 0);
        assert_eq!(
            markup(&new),
            "<ul><li>d</li><li>c</li><li>b</li><li>a</li></ul>"
        );
    }

    #[test]
    fn keyed_insert_and_remove_in_the_middle() {
        let patcher = patcher();
        let old = keyed_list(&["a", "b", "c"]);
        patcher.patch(None, Some(&old), false);
        patcher.backend().reset_stats();

        let new = keyed_list(&["a", "x", "c"]);
        patcher.patch(Some(&old), Some(&new), false);

        let stats = patcher.backend().stats();
        // <li>x</li> plus its text node
        assert_eq!(stats.creates, 2);
        assert_eq!(stats.removes, 1);
        assert_eq!(
            markup(&new),
            "<ul><li>a</li><li>x</li><li>c</li></ul>"
        );
    }

    #[test]
    fn root_replacement_swaps_the_host_node() {
        let patcher = patcher();
        let container = patcher.backend().create_element("body");
        let old = element("div").text_child("old").build();
        patcher.patch(None, Some(&old), false);
        patcher
            .backend()
            .append_child(&container, &old.host().unwrap());

        let new = element("section").text_child("new").build();
        patcher.patch(Some(&old), Some(&new), false);
        assert_eq!(container.to_markup(), "<body><section>new</section></body>");
    }

    #[test]
    fn static_trees_are_adopted_without_diffing() {
        let patcher = patcher();
        let old = element("div").static_node().text_child("frozen").build();
        patcher.patch(None, Some(&old), false);
        patcher.backend().reset_stats();

        let new = old.clone_node();
        patcher.patch(Some(&old), Some(&new), false);

        assert_eq!(patcher.backend().stats(), crate::vdom::OpStats::default());
        assert_eq!(new.host(), old.host());
    }

    #[test]
    fn reused_materialized_child_is_cloned_into_its_slot() {
        let patcher = patcher();
        let shared = element("span").text_child("shared").build();
        let first = element("div").child(shared.clone()).build();
        patcher.patch(None, Some(&first), false);
        assert!(shared.host().is_some());

        // the already materialized handle appears in a second tree
        let second = element("div").child(shared.clone()).build();
        patcher.patch(None, Some(&second), false);

        let slot = second.children()[0].clone();
        assert!(!slot.same_instance(&shared), "slot must hold a defensive clone");
        assert!(slot.is_cloned());
        // the original keeps its host reference untouched
        assert_ne!(shared.host(), slot.host());
        assert_eq!(slot.host().unwrap().to_markup(), "<span>shared</span>");
    }

    #[test]
    fn remove_hook_defers_detachment_until_done() {
        let handle_slot: Rc<RefCell<Option<Rc<RemoveHandle>>>> =
            Rc::new(RefCell::new(None));
        let slot = handle_slot.clone();
        let module = Module {
            name: "leave",
            remove: Some(Box::new(move |_vnode, handle: &Rc<RemoveHandle>| {
                *slot.borrow_mut() = Some(Rc::clone(handle));
            })),
            ..Module::default()
        };
        let patcher = Patcher::new(MemoryBackend::new(), vec![module]);

        let old = element("div")
            .child(element("span").attr("id", "leaving").build())
            .build();
        patcher.patch(None, Some(&old), false);

        let new = element("div").build();
        patcher.patch(Some(&old), Some(&new), false);

        // no attrs module is registered, the host renders bare
        assert_eq!(markup(&new), "<div><span></span></div>");
        let handle = handle_slot.borrow().clone().unwrap();
        handle.done();
        assert_eq!(markup(&new), "<div></div>");
    }

    #[test]
    fn insert_hooks_fire_after_attachment_in_tree_order() {
        let order: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let hook_for = |label: &str| {
            let order = order.clone();
            let label = label.to_owned();
            NodeHooks {
                insert: Some(Box::new(move |_vnode: &VNode<MemoryNode>| {
                    order.borrow_mut().push(label.clone());
                })),
                ..NodeHooks::default()
            }
        };
        let patcher = patcher();
        let tree = element("div")
            .hooks(hook_for("outer"))
            .child(element("span").hooks(hook_for("inner")).build())
            .build();
        patcher.patch(None, Some(&tree), false);
        // children materialize before their parent
        assert_eq!(*order.borrow(), vec!["inner".to_owned(), "outer".to_owned()]);
    }

    #[test]
    fn destroy_hooks_run_children_first() {
        let order: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let hook_for = |label: &str| {
            let order = order.clone();
            let label = label.to_owned();
            NodeHooks {
                destroy: Some(Box::new(move |_vnode: &VNode<MemoryNode>| {
                    order.borrow_mut().push(label.clone());
                })),
                ..NodeHooks::default()
            }
        };
        let patcher = patcher();
        let tree = element("div")
            .hooks(hook_for("parent"))
            .child(element("span").hooks(hook_for("child")).build())
            .build();
        patcher.patch(None, Some(&tree), false);

        patcher.patch(Some(&tree), None, false);
        assert_eq!(*order.borrow(), vec!["child".to_owned(), "parent".to_owned()]);
    }

    #[test]
    fn same_vnode_distinguishes_input_subtypes() {
        let a: VNode<MemoryNode> = element("input").attr("type", "text").build();
        let b: VNode<MemoryNode> = element("input").attr("type", "password").build();
        let c: VNode<MemoryNode> = element("input").attr("type", "checkbox").build();
        assert!(same_vnode(&a, &b), "text-like subtypes share a host node");
        assert!(!same_vnode(&a, &c));
    }

    #[test]
    fn same_vnode_requires_matching_payload_presence() {
        let bare: VNode<MemoryNode> = element("div").build();
        let with_data: VNode<MemoryNode> = element("div").attr("id", "x").build();
        assert!(!same_vnode(&bare, &with_data));
    }

    #[test]
    fn patching_to_nothing_detaches_the_host() {
        let patcher = patcher();
        let container = patcher.backend().create_element("body");
        let tree = element("div").text_child("gone").build();
        patcher.patch(None, Some(&tree), false);
        patcher
            .backend()
            .append_child(&container, &tree.host().unwrap());
        assert_eq!(container.to_markup(), "<body><div>gone</div></body>");

        patcher.patch(Some(&tree), None, false);
        assert_eq!(container.to_markup(), "<body></body>");
    }

    #[test]
    fn keyless_children_are_matched_by_scan() {
        let patcher = patcher();
        let old = element("div")
            .child(element("p").build())
            .child(element("em").build())
            .child(element("b").build())
            .build();
        patcher.patch(None, Some(&old), false);
        patcher.backend().reset_stats();

        // only the middle child survives; the head/tail passes cannot
        // match it, the linear scan must
        let new = element("div").child(element("em").build()).build();
        patcher.patch(Some(&old), Some(&new), false);

        let stats = patcher.backend().stats();
        assert_eq!(stats.creates, 0, "the existing <em> host must be reused");
        assert_eq!(stats.removes, 2);
        assert_eq!(markup(&new), "<div><em></em></div>");
    }
}
