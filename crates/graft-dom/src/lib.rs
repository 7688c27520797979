//! graft DOM - Host document model
//!
//! Arena-based element tree with mutation observers and simulated activation.
//! This is the structure the search and watch crates operate on: it is owned
//! by the host page, the rest of graft only holds `NodeId`s into it.

mod node;
mod tree;
mod document;
mod mutation;
mod error;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::DomTree;
pub use document::{Document, ActivationListener, HIDDEN_ATTRIBUTE};
pub use mutation::{
    MutationType, MutationRecord, MutationObserverInit, MutationCallback, ObserverId,
};
pub use error::{DomError, DomResult};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
