//! In-Memory Backend
//!
//! A [`Backend`] over a plain node tree kept on the heap, with counters
//! for every category of mutation. The test suite asserts on those
//! counters to prove the reconciler's minimal-mutation properties (a
//! keyed reorder must move, not recreate; a no-op diff must touch
//! nothing).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::backend::{Backend, HostNodeType};

struct NodeInner {
    kind: HostNodeType,
    tag: String,
    text: RefCell<String>,
    attrs: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<MemoryNode>>,
    parent: RefCell<Weak<NodeInner>>,
}

/// Handle to one node of the in-memory host tree.
#[derive(Clone)]
pub struct MemoryNode {
    inner: Rc<NodeInner>,
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MemoryNode {}

impl MemoryNode {
    fn new(kind: HostNodeType, tag: &str, text: &str) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                kind,
                tag: tag.to_owned(),
                text: RefCell::new(text.to_owned()),
                attrs: RefCell::new(BTreeMap::new()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
            }),
        }
    }

    pub fn node_type(&self) -> HostNodeType {
        self.inner.kind
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn text(&self) -> String {
        self.inner.text.borrow().clone()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.inner.attrs.borrow().get(name).cloned()
    }

    pub fn children(&self) -> Vec<MemoryNode> {
        self.inner.children.borrow().clone()
    }

    fn parent(&self) -> Option<MemoryNode> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| MemoryNode { inner })
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent
                .inner
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(&child.inner, &self.inner));
            *self.inner.parent.borrow_mut() = Weak::new();
        }
    }

    /// Markup-like rendering of the subtree, for test assertions.
    pub fn to_markup(&self) -> String {
        match self.inner.kind {
            HostNodeType::Text => self.text(),
            HostNodeType::Comment => format!("<!--{}-->", self.text()),
            HostNodeType::Element => {
                let mut out = String::new();
                out.push('<');
                out.push_str(&self.inner.tag);
                for (name, value) in self.inner.attrs.borrow().iter() {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                for child in self.inner.children.borrow().iter() {
                    out.push_str(&child.to_markup());
                }
                out.push_str(&format!("</{}>", self.inner.tag));
                out
            }
        }
    }
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryNode({})", self.to_markup())
    }
}

/// Snapshot of the mutation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    /// Nodes created, of any type.
    pub creates: usize,
    /// First-time attachments of a node to a parent.
    pub inserts: usize,
    /// Re-attachments of a node that already had a parent.
    pub moves: usize,
    /// Explicit removals.
    pub removes: usize,
    /// Text rewrites.
    pub text_sets: usize,
}

/// Heap-backed [`Backend`] that records every mutation it performs.
#[derive(Default)]
pub struct MemoryBackend {
    creates: Cell<usize>,
    inserts: Cell<usize>,
    moves: Cell<usize>,
    removes: Cell<usize>,
    text_sets: Cell<usize>,
    known_tags: RefCell<Option<Vec<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict [`Backend::is_known_element`] to the given tags. With no
    /// restriction installed every tag is known.
    pub fn restrict_known_elements(&self, tags: &[&str]) {
        *self.known_tags.borrow_mut() =
            Some(tags.iter().map(|tag| (*tag).to_owned()).collect());
    }

    pub fn stats(&self) -> OpStats {
        OpStats {
            creates: self.creates.get(),
            inserts: self.inserts.get(),
            moves: self.moves.get(),
            removes: self.removes.get(),
            text_sets: self.text_sets.get(),
        }
    }

    pub fn reset_stats(&self) {
        self.creates.set(0);
        self.inserts.set(0);
        self.moves.set(0);
        self.removes.set(0);
        self.text_sets.set(0);
    }

    fn attach(&self, parent: &MemoryNode, node: &MemoryNode, index: Option<usize>) {
        if node.parent().is_some() {
            self.moves.set(self.moves.get() + 1);
        } else {
            self.inserts.set(self.inserts.get() + 1);
        }
        node.detach();
        *node.inner.parent.borrow_mut() = Rc::downgrade(&parent.inner);
        let mut children = parent.inner.children.borrow_mut();
        match index {
            Some(index) => children.insert(index, node.clone()),
            None => children.push(node.clone()),
        }
    }
}

impl Backend for MemoryBackend {
    type Node = MemoryNode;

    fn create_element(&self, tag: &str) -> MemoryNode {
        self.creates.set(self.creates.get() + 1);
        MemoryNode::new(HostNodeType::Element, tag, "")
    }

    fn create_element_ns(&self, ns: &str, tag: &str) -> MemoryNode {
        self.creates.set(self.creates.get() + 1);
        let node = MemoryNode::new(HostNodeType::Element, tag, "");
        node.inner
            .attrs
            .borrow_mut()
            .insert("xmlns".to_owned(), ns.to_owned());
        node
    }

    fn create_text(&self, text: &str) -> MemoryNode {
        self.creates.set(self.creates.get() + 1);
        MemoryNode::new(HostNodeType::Text, "", text)
    }

    fn create_comment(&self, text: &str) -> MemoryNode {
        self.creates.set(self.creates.get() + 1);
        MemoryNode::new(HostNodeType::Comment, "", text)
    }

    fn insert_before(&self, parent: &MemoryNode, node: &MemoryNode, reference: &MemoryNode) {
        // Detaching `node` first may shift the reference position, so the
        // index is computed after the detach inside attach().
        let already_parented = node.parent().is_some();
        if already_parented {
            self.moves.set(self.moves.get() + 1);
        } else {
            self.inserts.set(self.inserts.get() + 1);
        }
        node.detach();
        let index = parent
            .inner
            .children
            .borrow()
            .iter()
            .position(|child| Rc::ptr_eq(&child.inner, &reference.inner));
        *node.inner.parent.borrow_mut() = Rc::downgrade(&parent.inner);
        let mut children = parent.inner.children.borrow_mut();
        match index {
            Some(index) => children.insert(index, node.clone()),
            None => children.push(node.clone()),
        }
    }

    fn append_child(&self, parent: &MemoryNode, child: &MemoryNode) {
        self.attach(parent, child, None);
    }

    fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) {
        self.removes.set(self.removes.get() + 1);
        parent
            .inner
            .children
            .borrow_mut()
            .retain(|existing| !Rc::ptr_eq(&existing.inner, &child.inner));
        *child.inner.parent.borrow_mut() = Weak::new();
    }

    fn parent_node(&self, node: &MemoryNode) -> Option<MemoryNode> {
        node.parent()
    }

    fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
        let parent = node.parent()?;
        let children = parent.inner.children.borrow();
        let position = children
            .iter()
            .position(|child| Rc::ptr_eq(&child.inner, &node.inner))?;
        children.get(position + 1).cloned()
    }

    fn first_child(&self, node: &MemoryNode) -> Option<MemoryNode> {
        node.inner.children.borrow().first().cloned()
    }

    fn node_type(&self, node: &MemoryNode) -> HostNodeType {
        node.inner.kind
    }

    fn tag_name(&self, node: &MemoryNode) -> Option<String> {
        match node.inner.kind {
            HostNodeType::Element => Some(node.inner.tag.clone()),
            _ => None,
        }
    }

    fn text_content(&self, node: &MemoryNode) -> Option<String> {
        match node.inner.kind {
            HostNodeType::Element => None,
            _ => Some(node.text()),
        }
    }

    fn set_text_content(&self, node: &MemoryNode, text: &str) {
        self.text_sets.set(self.text_sets.get() + 1);
        match node.inner.kind {
            HostNodeType::Element => {
                for child in node.children() {
                    *child.inner.parent.borrow_mut() = Weak::new();
                }
                node.inner.children.borrow_mut().clear();
                if !text.is_empty() {
                    let child = MemoryNode::new(HostNodeType::Text, "", text);
                    *child.inner.parent.borrow_mut() = Rc::downgrade(&node.inner);
                    node.inner.children.borrow_mut().push(child);
                }
            }
            _ => *node.inner.text.borrow_mut() = text.to_owned(),
        }
    }

    fn set_scope_attribute(&self, node: &MemoryNode, scope_id: &str) {
        node.inner
            .attrs
            .borrow_mut()
            .insert(scope_id.to_owned(), String::new());
    }

    fn is_known_element(&self, tag: &str) -> bool {
        match self.known_tags.borrow().as_ref() {
            Some(tags) => tags.iter().any(|known| known == tag),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_of_parented_node_counts_as_move() {
        let backend = MemoryBackend::new();
        let parent = backend.create_element("ul");
        let a = backend.create_element("li");
        let b = backend.create_element("li");
        backend.append_child(&parent, &a);
        backend.append_child(&parent, &b);
        assert_eq!(backend.stats().inserts, 2);
        assert_eq!(backend.stats().moves, 0);

        // Moving `b` before `a` reorders without a fresh insert.
        backend.insert_before(&parent, &b, &a);
        assert_eq!(backend.stats().moves, 1);
        let tags: Vec<_> = parent.children().iter().map(|c| c.to_markup()).collect();
        assert_eq!(tags, vec!["<li></li>", "<li></li>"]);
        assert_eq!(parent.children()[0], b);
    }

    #[test]
    fn markup_rendering() {
        let backend = MemoryBackend::new();
        let div = backend.create_element("div");
        let text = backend.create_text("hello");
        backend.append_child(&div, &text);
        assert_eq!(div.to_markup(), "<div>hello</div>");

        backend.set_text_content(&div, "bye");
        assert_eq!(div.to_markup(), "<div>bye</div>");
    }

    #[test]
    fn sibling_navigation() {
        let backend = MemoryBackend::new();
        let parent = backend.create_element("div");
        let a = backend.create_text("a");
        let b = backend.create_text("b");
        backend.append_child(&parent, &a);
        backend.append_child(&parent, &b);

        assert_eq!(backend.first_child(&parent), Some(a.clone()));
        assert_eq!(backend.next_sibling(&a), Some(b.clone()));
        assert_eq!(backend.next_sibling(&b), None);
        assert_eq!(backend.parent_node(&a), Some(parent));
    }
}
