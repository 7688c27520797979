//! Descending tree search
//!
//! Works level by level on sibling collections. A chain filter satisfied
//! anywhere in a collection unlocks the next filter for the children of the
//! *whole* collection, not only for the children of the nodes that matched.
//! Searches therefore tolerate small structural changes between host
//! releases, at the price of not guaranteeing that the matched prefix and the
//! final node sit on the same branch.

use graft_dom::{DomTree, NodeId};

use crate::{Filter, FilterChain, SearchResult};

/// Chained descending search from a root node
#[derive(Clone)]
pub struct TreeSearchEngine<'t> {
    tree: &'t DomTree,
    root: Option<NodeId>,
    chain: FilterChain,
}

impl<'t> TreeSearchEngine<'t> {
    /// Search below `root`. The first level examined is the element children of `root`.
    pub fn new(tree: &'t DomTree, root: NodeId) -> Self {
        Self::from_optional(tree, Some(root))
    }

    /// An absent root finds nothing
    pub(crate) fn from_optional(tree: &'t DomTree, root: Option<NodeId>) -> Self {
        Self { tree, root, chain: FilterChain::new() }
    }

    /// Add an intermediate filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.chain.add_filter(filter);
        self
    }

    /// All nodes accepted by `terminal` once every intermediate filter was
    /// satisfied at or above them, in structural order
    pub fn find(&self, terminal: &Filter) -> Vec<NodeId> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut chain = self.chain.clone();
        chain.add_filter(terminal.clone());

        let start = self.tree.element_children(root);
        let found = self.search(&start, chain);
        tracing::trace!(
            "Search below {} with {} filters found {} nodes",
            root,
            self.chain.len() + 1,
            found.len()
        );
        found
    }

    pub fn find_first(&self, terminal: &Filter) -> SearchResult<'t> {
        SearchResult::new(self.tree, self.find(terminal).first().copied())
    }

    pub fn find_last(&self, terminal: &Filter) -> SearchResult<'t> {
        SearchResult::new(self.tree, self.find(terminal).last().copied())
    }

    fn search(&self, collection: &[NodeId], mut chain: FilterChain) -> Vec<NodeId> {
        if collection.is_empty() {
            return Vec::new();
        }
        let Some(entry) = chain.current_or_next_unprocessed() else {
            return Vec::new();
        };

        let matched = entry.filter().apply(self.tree, collection);
        if !matched.is_empty() {
            entry.mark_processed();
            if chain.are_all_processed() {
                return matched;
            }
        }

        let mut results = Vec::new();
        for &node in collection {
            let children = self.tree.element_children(node);
            results.extend(self.search(&children, chain.clone_without_processed()));
        }
        results
    }
}

impl std::fmt::Debug for TreeSearchEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSearchEngine")
            .field("root", &self.root)
            .field("chain", &self.chain)
            .finish()
    }
}
