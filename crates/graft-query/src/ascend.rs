//! Ascending search: nearest ancestor matching a filter

use graft_dom::{DomTree, NodeId};

use crate::{Filter, SearchResult};

/// Climbs parent links from a starting node
#[derive(Clone, Copy)]
pub struct AscendingSearch<'t> {
    tree: &'t DomTree,
    start: Option<NodeId>,
}

impl<'t> AscendingSearch<'t> {
    pub fn new(tree: &'t DomTree, start: NodeId) -> Self {
        Self { tree, start: Some(start) }
    }

    pub(crate) fn from_optional(tree: &'t DomTree, start: Option<NodeId>) -> Self {
        Self { tree, start }
    }

    /// First node accepted by `filter`, testing the start node itself first
    pub fn find(&self, filter: &Filter) -> SearchResult<'t> {
        let mut current = self.start;
        while let Some(node) = current {
            if let Some(found) = filter.apply_single(self.tree, node) {
                return SearchResult::new(self.tree, Some(found));
            }
            current = self.tree.parent(node);
        }
        SearchResult::new(self.tree, None)
    }
}

impl std::fmt::Debug for AscendingSearch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AscendingSearch").field("start", &self.start).finish()
    }
}
