//! Host Tree Abstraction
//!
//! The reconciler never touches a concrete rendering target directly; all
//! host mutation and inspection goes through [`Backend`]. A backend exposes
//! an opaque node handle plus the small set of primitives the patch and
//! hydration algorithms need.
//!
//! [`MemoryBackend`](crate::vdom::MemoryBackend) is the in-tree
//! implementation used by the test suite and benchmarks.

/// Coarse classification of an existing host node, used by hydration to
/// check that pre-rendered content matches its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNodeType {
    Element,
    Text,
    Comment,
}

/// Rendering target for the reconciler.
///
/// Node handles are cheap clones of a reference to the same underlying
/// host node; `PartialEq` must compare that identity, not content.
pub trait Backend: 'static {
    type Node: Clone + PartialEq + 'static;

    fn create_element(&self, tag: &str) -> Self::Node;
    fn create_element_ns(&self, ns: &str, tag: &str) -> Self::Node;
    fn create_text(&self, text: &str) -> Self::Node;
    fn create_comment(&self, text: &str) -> Self::Node;

    /// Insert `node` into `parent` immediately before `reference`. A node
    /// that already has a parent is detached first (a move).
    fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: &Self::Node);
    fn append_child(&self, parent: &Self::Node, child: &Self::Node);
    fn remove_child(&self, parent: &Self::Node, child: &Self::Node);

    fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
    fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;

    fn node_type(&self, node: &Self::Node) -> HostNodeType;
    /// Tag of an element node, `None` otherwise.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;
    /// Text of a text or comment node, `None` for elements.
    fn text_content(&self, node: &Self::Node) -> Option<String>;
    /// Replace an element's content with a single text child, or rewrite
    /// the content of a text/comment node.
    fn set_text_content(&self, node: &Self::Node, text: &str);

    /// Apply a scoped-style marker attribute to an element.
    fn set_scope_attribute(&self, node: &Self::Node, scope_id: &str);

    /// Whether `tag` names an element this target understands. Used only
    /// for the development-mode unknown-element warning.
    fn is_known_element(&self, _tag: &str) -> bool {
        true
    }
}
