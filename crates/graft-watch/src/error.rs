//! Watch errors

use std::time::Duration;

use graft_dom::DomError;

/// Readiness waiting errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    /// Builder is missing a required part; reported before any waiting
    #[error("readiness waiter misconfigured: {0}")]
    NotConfigured(&'static str),
    /// Query still empty at this attempt
    #[error("query returned nothing")]
    NotReady,
    /// Retry bound reached
    #[error("query still empty after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("no match within {0:?}")]
    TimedOut(Duration),
    /// The watcher went away before the query matched
    #[error("watcher disconnected before the query matched")]
    Cancelled,
}

/// Reconciliation errors. The container is visible again whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Dom(#[from] DomError),
    /// A burst arrived but held no usable candidate
    #[error("no candidate among {events} change events")]
    NoCandidate { events: usize },
    /// No change arrived at all
    #[error("no change within {0:?}")]
    TimedOut(Duration),
    /// The watcher was disconnected from outside, e.g. by `disconnect_all`
    #[error("watcher disconnected before the burst was resolved")]
    Cancelled,
}
