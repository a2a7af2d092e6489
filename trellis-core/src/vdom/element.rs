//! Tree-Building Sugar
//!
//! Builders for assembling virtual trees by hand. Render layers above
//! this crate typically generate [`VNode`]s directly; the builder exists
//! for tests, benchmarks, and embedders without a template layer.

use std::rc::Rc;

use super::vnode::{Key, Kind, NodeData, NodeHooks, VNode};

/// Start describing a host element.
pub fn element<N: Clone>(tag: impl Into<String>) -> ElementBuilder<N> {
    ElementBuilder::new(Kind::Element(tag.into()))
}

/// Start describing a component boundary. The component's `init` hook
/// (see [`ElementBuilder::hooks`]) is responsible for mounting an
/// instance and recording its root.
pub fn component<N: Clone>(name: impl Into<String>) -> ElementBuilder<N> {
    ElementBuilder::new(Kind::Component(name.into()))
}

/// A text node.
pub fn text<N: Clone>(content: impl Into<String>) -> VNode<N> {
    VNode::text_node(content)
}

/// A comment node.
pub fn comment<N: Clone>(content: impl Into<String>) -> VNode<N> {
    VNode::comment(content)
}

/// The empty node.
pub fn empty<N: Clone>() -> VNode<N> {
    VNode::empty()
}

pub struct ElementBuilder<N: Clone> {
    kind: Kind,
    key: Option<Key>,
    data: Option<NodeData<N>>,
    children: Vec<VNode<N>>,
    ns: Option<String>,
    is_static: bool,
    is_once: bool,
}

impl<N: Clone> ElementBuilder<N> {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            key: None,
            data: None,
            children: Vec::new(),
            ns: None,
            is_static: false,
            is_once: false,
        }
    }

    fn data_mut(&mut self) -> &mut NodeData<N> {
        self.data.get_or_insert_with(NodeData::default)
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_mut().attrs.insert(name.into(), value.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.data_mut().class = Some(class.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.data_mut().style = Some(style.into());
        self
    }

    pub fn on(mut self, event: impl Into<String>, handler: Rc<dyn Fn()>) -> Self {
        self.data_mut().on.push((event.into(), handler));
        self
    }

    pub fn hooks(mut self, hooks: NodeHooks<N>) -> Self {
        self.data_mut().hook = Some(Rc::new(hooks));
        self
    }

    /// Mark the subtree as raw content, suppressing unknown-element
    /// warnings underneath.
    pub fn raw(mut self) -> Self {
        self.data_mut().pre = true;
        self
    }

    pub fn scope_id(mut self, scope: impl Into<String>) -> Self {
        self.data_mut().scope_id = Some(scope.into());
        self
    }

    pub fn keep_alive(mut self) -> Self {
        self.data_mut().keep_alive = true;
        self
    }

    pub fn ns(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    /// Mark as part of a static tree: the reconciler skips the subtree
    /// entirely when old and new are both static with the same key.
    pub fn static_node(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Render once; treated like a static subtree on later passes.
    pub fn once(mut self) -> Self {
        self.is_once = true;
        self
    }

    pub fn child(mut self, child: VNode<N>) -> Self {
        self.push(child);
        self
    }

    pub fn text_child(mut self, content: impl Into<String>) -> Self {
        self.push(VNode::text_node(content));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode<N>>) -> Self {
        for child in children {
            self.push(child);
        }
        self
    }

    // Adjacent text nodes merge, the same normalization a template layer
    // performs.
    fn push(&mut self, child: VNode<N>) {
        if let (Some(last), Kind::Text) = (self.children.last(), child.kind()) {
            if matches!(last.kind(), Kind::Text) {
                let merged = format!(
                    "{}{}",
                    last.text().unwrap_or(""),
                    child.text().unwrap_or("")
                );
                let index = self.children.len() - 1;
                self.children[index] = VNode::text_node(merged);
                return;
            }
        }
        self.children.push(child);
    }

    pub fn build(self) -> VNode<N> {
        VNode::build(
            self.kind,
            self.key,
            self.data,
            self.children,
            None,
            self.ns,
            self.is_static,
            self.is_once,
            None,
        )
    }
}
