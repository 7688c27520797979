//! Filter chains
//!
//! An ordered list of filters with a processed flag each. Chains are copied
//! on every descent and the copy only keeps what is still unprocessed, so
//! sibling branches never see each other's progress.

use crate::Filter;

/// One step of a chain
#[derive(Debug, Clone)]
pub struct FilterChainEntry {
    filter: Filter,
    processed: bool,
}

impl FilterChainEntry {
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Processed entries stay processed for the rest of the search call
    pub fn mark_processed(&mut self) {
        self.processed = true;
    }
}

/// Ordered, partially processed filter sequence
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    entries: Vec<FilterChainEntry>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.entries.push(FilterChainEntry { filter, processed: false });
    }

    /// First entry not yet processed, in chain order
    pub fn current_or_next_unprocessed(&mut self) -> Option<&mut FilterChainEntry> {
        self.entries.iter_mut().find(|e| !e.processed)
    }

    pub fn are_all_processed(&self) -> bool {
        self.entries.iter().all(|e| e.processed)
    }

    /// Copy of the unprocessed entries only, original order kept
    pub fn clone_without_processed(&self) -> FilterChain {
        FilterChain {
            entries: self.entries.iter().filter(|e| !e.processed).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FilterChainEntry] {
        &self.entries
    }
}

impl FromIterator<Filter> for FilterChain {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        let mut chain = FilterChain::new();
        for filter in iter {
            chain.add_filter(filter);
        }
        chain
    }
}
