//! Chainable search result

use graft_dom::{DomTree, NodeId};

use crate::{AscendingSearch, TreeSearchEngine};

/// A possibly absent node, plus the tree it was found in.
///
/// Further searches can be chained without checking for absence first: a
/// search started from an absent result simply finds nothing.
#[derive(Clone, Copy)]
pub struct SearchResult<'t> {
    tree: &'t DomTree,
    node: Option<NodeId>,
}

impl<'t> SearchResult<'t> {
    pub fn new(tree: &'t DomTree, node: Option<NodeId>) -> Self {
        Self { tree, node }
    }

    pub fn exists(&self) -> bool {
        self.node.is_some()
    }

    pub fn not_exists(&self) -> bool {
        self.node.is_none()
    }

    /// Peek at the node without consuming the result
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn consume(self) -> Option<NodeId> {
        self.node
    }

    /// Continue upward. With `jump_to_parent_first` the found node itself is skipped.
    pub fn into_ascending_search(self, jump_to_parent_first: bool) -> AscendingSearch<'t> {
        let start = if jump_to_parent_first {
            self.node.and_then(|n| self.tree.parent(n))
        } else {
            self.node
        };
        AscendingSearch::from_optional(self.tree, start)
    }

    /// Continue downward from the found node
    pub fn into_tree_search_engine(self) -> TreeSearchEngine<'t> {
        TreeSearchEngine::from_optional(self.tree, self.node)
    }
}

impl std::fmt::Debug for SearchResult<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SearchResult").field(&self.node).finish()
    }
}
