//! Virtual Nodes
//!
//! A [`VNode`] is an immutable-by-convention description of one node of the
//! tree to render. The reconciler diffs a new description against the
//! previous one and mutates the host tree to match; the description itself
//! is never the thing rendered.
//!
//! The few mutable slots a vnode carries (`host`, the cloned/async flags,
//! the component root) exist because materialization writes back into the
//! description: the vnode that most recently produced a host node owns the
//! back-reference to it. Reusing such a vnode as a *new* description is
//! illegal and is defended against inside the reconciler by cloning on
//! demand ([`VNode::clone_node`]).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::vdom::modules::RemoveHandle;

/// What a virtual node describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// A host element with the given tag.
    Element(String),
    /// A component boundary. Materialization is delegated to the
    /// component's `init` hook, which mounts an instance and records its
    /// root via [`VNode::set_component_root`].
    Component(String),
    /// A text node; content in [`VNode::text`].
    Text,
    /// A comment node; content in [`VNode::text`].
    Comment,
    /// Renders as an empty comment node.
    Empty,
    /// Stand-in for a tree whose real content resolves later.
    AsyncPlaceholder,
}

impl Kind {
    /// Element tag, if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Kind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// Whether this kind materializes as a comment node.
    pub fn is_comment_like(&self) -> bool {
        matches!(self, Kind::Comment | Kind::Empty | Kind::AsyncPlaceholder)
    }
}

/// Identity hint for a vnode across reconciliation passes.
///
/// Keys must be unique among siblings. Only primitive keys exist: the type
/// makes the original's "non-primitive key" misuse unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Str(String),
    Num(i64),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_owned())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Num(value)
    }
}

/// Per-vnode lifecycle hooks carried in the attributes payload.
///
/// These fire in addition to the module hooks registered on the patcher,
/// at the corresponding points of the reconciliation state machine.
pub struct NodeHooks<N: Clone> {
    /// Component initialization: mount an instance, set the component
    /// root. Second argument is `true` when hydrating.
    pub init: Option<Box<dyn Fn(&VNode<N>, bool)>>,
    pub create: Option<Box<dyn Fn(Option<&VNode<N>>, &VNode<N>)>>,
    /// Runs once the node is actually attached to the host tree.
    pub insert: Option<Box<dyn Fn(&VNode<N>)>>,
    pub prepatch: Option<Box<dyn Fn(&VNode<N>, &VNode<N>)>>,
    pub update: Option<Box<dyn Fn(&VNode<N>, &VNode<N>)>>,
    pub postpatch: Option<Box<dyn Fn(&VNode<N>, &VNode<N>)>>,
    pub destroy: Option<Box<dyn Fn(&VNode<N>)>>,
    /// Deferred removal: the host node detaches once `handle.done()` has
    /// been called by every registered listener.
    pub remove: Option<Box<dyn Fn(&VNode<N>, &Rc<RemoveHandle>)>>,
}

impl<N: Clone> Default for NodeHooks<N> {
    fn default() -> Self {
        Self {
            init: None,
            create: None,
            insert: None,
            prepatch: None,
            update: None,
            postpatch: None,
            destroy: None,
            remove: None,
        }
    }
}

/// The attributes/behaviors payload of a vnode.
///
/// Opaque to the reconciler except for the reserved `hook` bundle and the
/// handful of flags below; hook modules (attrs, class, style, events, ...)
/// interpret the rest.
pub struct NodeData<N: Clone> {
    pub attrs: BTreeMap<String, String>,
    pub class: Option<String>,
    pub style: Option<String>,
    /// Event listeners, consumed by an events hook module.
    pub on: Vec<(String, Rc<dyn Fn()>)>,
    pub hook: Option<Rc<NodeHooks<N>>>,
    /// Subtree contains pre-formatted/raw markup; suppresses the
    /// unknown-element warning underneath.
    pub pre: bool,
    /// Scoped-style attribute applied to the host node.
    pub scope_id: Option<String>,
    /// The component instance survives across detaches (keep-alive).
    pub keep_alive: bool,
    /// Insert hooks of a component subtree whose attachment is deferred
    /// until an ancestor placeholder materializes.
    pub(crate) pending_insert: RefCell<Vec<VNode<N>>>,
}

impl<N: Clone> Default for NodeData<N> {
    fn default() -> Self {
        Self {
            attrs: BTreeMap::new(),
            class: None,
            style: None,
            on: Vec::new(),
            hook: None,
            pre: false,
            scope_id: None,
            keep_alive: false,
            pending_insert: RefCell::new(Vec::new()),
        }
    }
}

impl<N: Clone> NodeData<N> {
    /// Whether hydration must run the full create-hook pass for this
    /// payload. Attributes, class, style and the key are assumed already
    /// applied by the external renderer; events and a hook bundle are not.
    pub(crate) fn needs_full_create(&self) -> bool {
        !self.on.is_empty() || self.hook.is_some()
    }
}

impl<N: Clone> Debug for NodeData<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeData")
            .field("attrs", &self.attrs)
            .field("class", &self.class)
            .field("style", &self.style)
            .field("listeners", &self.on.len())
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}

/// Factory for async subtrees: records the resolved content (or an error)
/// once it arrives. Identity-compared by pointer during reconciliation.
pub struct AsyncFactory<N: Clone> {
    resolved: RefCell<Option<VNode<N>>>,
    errored: Cell<bool>,
}

impl<N: Clone> AsyncFactory<N> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            resolved: RefCell::new(None),
            errored: Cell::new(false),
        })
    }

    /// Record the resolved content.
    pub fn resolve(&self, vnode: VNode<N>) {
        *self.resolved.borrow_mut() = Some(vnode);
    }

    /// Record a resolution failure.
    pub fn fail(&self) {
        self.errored.set(true);
    }

    pub fn resolved(&self) -> Option<VNode<N>> {
        self.resolved.borrow().clone()
    }

    pub fn has_error(&self) -> bool {
        self.errored.get()
    }
}

struct VNodeInner<N: Clone> {
    kind: Kind,
    key: Option<Key>,
    data: Option<NodeData<N>>,
    children: RefCell<Vec<VNode<N>>>,
    text: Option<String>,
    ns: Option<String>,

    host: RefCell<Option<N>>,
    parent: RefCell<Option<Weak<VNodeInner<N>>>>,
    component_root: RefCell<Option<VNode<N>>>,
    async_factory: Option<Rc<AsyncFactory<N>>>,

    is_static: bool,
    is_once: bool,
    is_cloned: Cell<bool>,
    is_async_placeholder: Cell<bool>,
}

/// One node of a virtual tree. Cloning the handle is cheap and shares the
/// underlying description; see [`VNode::clone_node`] for a fresh copy.
pub struct VNode<N: Clone> {
    inner: Rc<VNodeInner<N>>,
}

impl<N: Clone> VNode<N> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        kind: Kind,
        key: Option<Key>,
        data: Option<NodeData<N>>,
        children: Vec<VNode<N>>,
        text: Option<String>,
        ns: Option<String>,
        is_static: bool,
        is_once: bool,
        async_factory: Option<Rc<AsyncFactory<N>>>,
    ) -> Self {
        Self {
            inner: Rc::new(VNodeInner {
                kind,
                key,
                data,
                children: RefCell::new(children),
                text,
                ns,
                host: RefCell::new(None),
                parent: RefCell::new(None),
                component_root: RefCell::new(None),
                async_factory,
                is_static,
                is_once,
                is_cloned: Cell::new(false),
                is_async_placeholder: Cell::new(false),
            }),
        }
    }

    /// A text node.
    pub fn text_node(text: impl Into<String>) -> Self {
        Self::build(
            Kind::Text,
            None,
            None,
            Vec::new(),
            Some(text.into()),
            None,
            false,
            false,
            None,
        )
    }

    /// A comment node.
    pub fn comment(text: impl Into<String>) -> Self {
        Self::build(
            Kind::Comment,
            None,
            None,
            Vec::new(),
            Some(text.into()),
            None,
            false,
            false,
            None,
        )
    }

    /// The empty node: renders as an empty comment.
    pub fn empty() -> Self {
        Self::build(
            Kind::Empty,
            None,
            None,
            Vec::new(),
            None,
            None,
            false,
            false,
            None,
        )
    }

    /// A placeholder for a tree whose content `factory` resolves later.
    pub fn async_placeholder(factory: Rc<AsyncFactory<N>>) -> Self {
        Self::build(
            Kind::AsyncPlaceholder,
            None,
            None,
            Vec::new(),
            None,
            None,
            false,
            false,
            Some(factory),
        )
    }

    pub fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    pub fn key(&self) -> Option<&Key> {
        self.inner.key.as_ref()
    }

    pub fn data(&self) -> Option<&NodeData<N>> {
        self.inner.data.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.inner.text.as_deref()
    }

    pub fn ns(&self) -> Option<&str> {
        self.inner.ns.as_deref()
    }

    /// The reserved hook bundle, if any.
    pub fn hook(&self) -> Option<Rc<NodeHooks<N>>> {
        self.inner.data.as_ref().and_then(|data| data.hook.clone())
    }

    pub fn async_factory(&self) -> Option<&Rc<AsyncFactory<N>>> {
        self.inner.async_factory.as_ref()
    }

    /// Handles to the current children, in order.
    pub fn children(&self) -> Vec<VNode<N>> {
        self.inner.children.borrow().clone()
    }

    pub fn has_children(&self) -> bool {
        !self.inner.children.borrow().is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub(crate) fn replace_child(&self, index: usize, child: VNode<N>) {
        self.inner.children.borrow_mut()[index] = child;
    }

    /// Whether both nodes hold handle-identical children (diffing them
    /// would be a guaranteed no-op).
    pub(crate) fn identical_children(&self, other: &VNode<N>) -> bool {
        let mine = self.inner.children.borrow();
        let theirs = other.inner.children.borrow();
        mine.len() == theirs.len()
            && mine
                .iter()
                .zip(theirs.iter())
                .all(|(a, b)| Rc::ptr_eq(&a.inner, &b.inner))
    }

    /// The host node this description most recently materialized.
    pub fn host(&self) -> Option<N> {
        self.inner.host.borrow().clone()
    }

    pub(crate) fn set_host(&self, host: Option<N>) {
        *self.inner.host.borrow_mut() = host;
    }

    /// The ancestor placeholder this tree is the body of, if any.
    pub fn parent(&self) -> Option<VNode<N>> {
        self.inner
            .parent
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| VNode { inner })
    }

    /// Link this tree's root to the placeholder it fills.
    ///
    /// The link is weak: the placeholder owns its body, not the reverse.
    pub fn set_parent(&self, placeholder: &VNode<N>) {
        *self.inner.parent.borrow_mut() = Some(Rc::downgrade(&placeholder.inner));
    }

    /// Root vnode of the mounted component instance, for component nodes.
    pub fn component_root(&self) -> Option<VNode<N>> {
        self.inner.component_root.borrow().clone()
    }

    pub fn set_component_root(&self, root: Option<VNode<N>>) {
        *self.inner.component_root.borrow_mut() = root;
    }

    pub fn is_static(&self) -> bool {
        self.inner.is_static
    }

    pub fn is_once(&self) -> bool {
        self.inner.is_once
    }

    pub fn is_cloned(&self) -> bool {
        self.inner.is_cloned.get()
    }

    pub fn is_async_placeholder(&self) -> bool {
        matches!(self.inner.kind, Kind::AsyncPlaceholder)
            || self.inner.is_async_placeholder.get()
    }

    pub(crate) fn set_async_placeholder(&self, value: bool) {
        self.inner.is_async_placeholder.set(value);
    }

    /// Whether the two handles describe the very same vnode instance.
    pub fn same_instance(&self, other: &VNode<N>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Shallow copy used when a materialized vnode reappears as a fresh
    /// description: overwriting its host reference in place would corrupt
    /// later insertion-reference lookups, so the reconciler clones first.
    pub fn clone_node(&self) -> VNode<N> {
        let inner = &self.inner;
        let cloned = VNode {
            inner: Rc::new(VNodeInner {
                kind: inner.kind.clone(),
                key: inner.key.clone(),
                data: inner.data.as_ref().map(|data| NodeData {
                    attrs: data.attrs.clone(),
                    class: data.class.clone(),
                    style: data.style.clone(),
                    on: data.on.clone(),
                    hook: data.hook.clone(),
                    pre: data.pre,
                    scope_id: data.scope_id.clone(),
                    keep_alive: data.keep_alive,
                    pending_insert: RefCell::new(Vec::new()),
                }),
                children: RefCell::new(inner.children.borrow().clone()),
                text: inner.text.clone(),
                ns: inner.ns.clone(),
                host: RefCell::new(inner.host.borrow().clone()),
                parent: RefCell::new(inner.parent.borrow().clone()),
                component_root: RefCell::new(inner.component_root.borrow().clone()),
                async_factory: inner.async_factory.clone(),
                is_static: inner.is_static,
                is_once: inner.is_once,
                is_cloned: Cell::new(true),
                is_async_placeholder: Cell::new(inner.is_async_placeholder.get()),
            }),
        };
        cloned
    }
}

impl<N: Clone> Clone for VNode<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<N: Clone> Debug for VNode<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VNode")
            .field("kind", &self.inner.kind)
            .field("key", &self.inner.key)
            .field("text", &self.inner.text)
            .field("children", &self.child_count())
            .field("materialized", &self.inner.host.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestNode = u32;

    #[test]
    fn clone_node_is_marked_and_independent() {
        let original: VNode<TestNode> = VNode::build(
            Kind::Element("div".into()),
            Some(Key::from("a")),
            Some(NodeData::default()),
            vec![VNode::text_node("hi")],
            None,
            None,
            true,
            false,
            None,
        );
        original.set_host(Some(7));

        let cloned = original.clone_node();
        assert!(cloned.is_cloned());
        assert!(!original.is_cloned());
        assert!(!cloned.same_instance(&original));

        // The clone starts from the same host reference but owns its slot.
        assert_eq!(cloned.host(), Some(7));
        cloned.set_host(Some(9));
        assert_eq!(original.host(), Some(7));

        // Children are shared handles in a fresh list.
        assert!(original.identical_children(&cloned));
    }

    #[test]
    fn handle_clone_shares_the_instance() {
        let vnode: VNode<TestNode> = VNode::text_node("x");
        let alias = vnode.clone();
        assert!(alias.same_instance(&vnode));
        alias.set_host(Some(1));
        assert_eq!(vnode.host(), Some(1));
    }

    #[test]
    fn parent_link_is_weak() {
        let placeholder: VNode<TestNode> = VNode::empty();
        let root: VNode<TestNode> = VNode::text_node("body");
        root.set_parent(&placeholder);
        assert!(root.parent().is_some());

        drop(placeholder);
        assert!(root.parent().is_none());
    }

    #[test]
    fn async_placeholder_flag_follows_kind_or_marking() {
        let factory: Rc<AsyncFactory<TestNode>> = AsyncFactory::new();
        let placeholder = VNode::async_placeholder(factory);
        assert!(placeholder.is_async_placeholder());

        let comment: VNode<TestNode> = VNode::comment("");
        assert!(!comment.is_async_placeholder());
        comment.set_async_placeholder(true);
        assert!(comment.is_async_placeholder());
    }
}
