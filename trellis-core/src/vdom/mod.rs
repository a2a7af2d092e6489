//! Virtual Tree Rendering
//!
//! The rendering half of the runtime: declarative descriptions of a node
//! tree ([`VNode`]) and the reconciler ([`Patcher`]) that diffs two
//! descriptions and applies the difference to a rendering target through
//! the [`Backend`] abstraction.
//!
//! # Structure
//!
//! - [`vnode`]: the tree description types ([`VNode`], [`Kind`], [`Key`],
//!   the payload [`NodeData`] and per-node [`NodeHooks`])
//! - [`element`]: builder sugar for assembling descriptions by hand
//! - [`backend`]: the host-tree trait the reconciler renders through
//! - [`memory`]: heap-backed backend with mutation counters, used by the
//!   test suite and benchmarks
//! - [`modules`]: pluggable cross-cutting hook bundles and the deferred
//!   removal handle
//! - [`patch`]: the reconciliation engine, including the keyed
//!   four-pointer child diff
//! - [`hydrate`]: adoption of pre-rendered host content
//!
//! # Typical driving loop
//!
//! A component's render effect produces a fresh [`VNode`] tree each run;
//! a reactive computation (see [`crate::reactive`]) re-runs it when its
//! dependencies change and feeds the old and new trees to
//! [`Patcher::patch`].

pub mod backend;
pub mod element;
mod hydrate;
pub mod memory;
pub mod modules;
pub mod patch;
pub mod vnode;

pub use backend::{Backend, HostNodeType};
pub use element::{comment, component, element, empty, text, ElementBuilder};
pub use memory::{MemoryBackend, MemoryNode, OpStats};
pub use modules::{Module, RemoveHandle};
pub use patch::{same_vnode, Patcher};
pub use vnode::{AsyncFactory, Key, Kind, NodeData, NodeHooks, VNode};
