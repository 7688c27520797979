//! graft Query - Pattern-based tree search
//!
//! Locates nodes in a tree the host re-renders at will, by structure and
//! content rather than fixed paths.
//!
//! # Example
//! ```rust,ignore
//! use graft_query::{Filter, TreeSearchEngine};
//!
//! let tree = document.tree();
//! let button = TreeSearchEngine::new(&tree, tree.root())
//!     .filter(Filter::tag("ytd-menu-renderer"))
//!     .find_first(&Filter::id("button", "more"));
//! if button.exists() {
//!     // ...
//! }
//! ```

mod filter;
mod chain;
mod engine;
mod ascend;
mod result;

pub use filter::Filter;
pub use chain::{FilterChain, FilterChainEntry};
pub use engine::TreeSearchEngine;
pub use ascend::AscendingSearch;
pub use result::SearchResult;
