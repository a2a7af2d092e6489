//! Hydration
//!
//! Adoption of pre-rendered host content: instead of building host nodes,
//! the tree walk pairs each vnode with the existing node at the same
//! position, records it as the vnode's host, and verifies that the two
//! agree. Any disagreement fails the whole attempt; the caller
//! ([`Patcher::mount`]) then falls back to a full render.
//!
//! Attributes, classes and static styles are assumed to have been
//! rendered correctly by whatever produced the markup, so their create
//! hooks are skipped. A payload carrying anything beyond those (event
//! listeners, a hook bundle) still gets the full create pass, since the
//! markup cannot have encoded it.

use crate::vdom::backend::{Backend, HostNodeType};
use crate::vdom::patch::Patcher;
use crate::vdom::vnode::{Kind, VNode};

impl<B: Backend> Patcher<B> {
    /// Adopt the existing host node `el` (and its subtree) as the
    /// materialization of `vnode`. Returns `false` on any mismatch, in
    /// which case partially adopted state is discarded by the caller's
    /// re-render.
    pub(super) fn hydrate(
        &self,
        el: &B::Node,
        vnode: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
    ) -> bool {
        if vnode.kind().is_comment_like() && vnode.async_factory().is_some() {
            vnode.set_host(Some(el.clone()));
            vnode.set_async_placeholder(true);
            return true;
        }

        if !self.node_matches(el, vnode) {
            return false;
        }
        vnode.set_host(Some(el.clone()));

        if let Some(data) = vnode.data() {
            if let Some(hook) = &data.hook {
                if let Some(init) = &hook.init {
                    init(vnode, true);
                }
            }
            if vnode.component_root().is_some() {
                // child component: it hydrated its own subtree
                self.init_component(vnode, queue);
                return true;
            }
        }

        match vnode.kind() {
            Kind::Element(_) => {
                if vnode.has_children() {
                    match self.backend.first_child(el) {
                        // the element was rendered empty: fill it in
                        None => self.create_children(vnode, queue),
                        Some(_) => {
                            if !self.hydrate_children(el, vnode, queue) {
                                return false;
                            }
                        }
                    }
                } else if let Some(text) = vnode.text() {
                    if !self.hydrate_direct_text(el, text) {
                        return false;
                    }
                }
                if let Some(data) = vnode.data() {
                    if data.needs_full_create() {
                        self.invoke_create_hooks(vnode, queue);
                    }
                }
            }
            Kind::Text => {
                let expected = vnode.text().unwrap_or("");
                if self.backend.text_content(el).as_deref() != Some(expected) {
                    self.backend.set_text_content(el, expected);
                }
            }
            _ => {}
        }
        true
    }

    fn hydrate_children(
        &self,
        el: &B::Node,
        vnode: &VNode<B::Node>,
        queue: &mut Vec<VNode<B::Node>>,
    ) -> bool {
        let children = vnode.children();
        let mut host_child = self.backend.first_child(el);
        for child in &children {
            let Some(current) = host_child else {
                // fewer host nodes than descriptions
                return false;
            };
            if !self.hydrate(&current, child, queue) {
                return false;
            }
            host_child = self.backend.next_sibling(&current);
        }
        // surplus host nodes the description never mentioned
        host_child.is_none()
    }

    /// An element vnode carrying direct text instead of children.
    fn hydrate_direct_text(&self, el: &B::Node, text: &str) -> bool {
        match self.backend.first_child(el) {
            None => {
                let node = self.backend.create_text(text);
                self.backend.append_child(el, &node);
                true
            }
            Some(first) => {
                self.backend.node_type(&first) == HostNodeType::Text
                    && self.backend.text_content(&first).as_deref() == Some(text)
                    && self.backend.next_sibling(&first).is_none()
            }
        }
    }

    fn node_matches(&self, el: &B::Node, vnode: &VNode<B::Node>) -> bool {
        match vnode.kind() {
            Kind::Element(tag) => {
                self.backend.node_type(el) == HostNodeType::Element
                    && self
                        .backend
                        .tag_name(el)
                        .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            }
            // the component's own init hook verifies its subtree
            Kind::Component(_) => self.backend.node_type(el) == HostNodeType::Element,
            Kind::Text => self.backend.node_type(el) == HostNodeType::Text,
            Kind::Comment | Kind::Empty | Kind::AsyncPlaceholder => {
                self.backend.node_type(el) == HostNodeType::Comment
            }
        }
    }
}
