//! graft Watch - Change watching and reconciliation
//!
//! Turns the host's noisy mutation stream into exactly-once actions:
//! - [`ChangeWatcher`]: one observe/disconnect contract over both the
//!   per-mutation and the per-query notifiers
//! - [`WatcherRegistry`]: oneshot and background watchers of one page
//! - [`ReadinessWaiter`]: resolve once a query finds something
//! - [`MutationReconciler`]: pick the single right node out of a burst and act on it
//!
//! Everything is single-threaded; async parts run on `smol`.

mod config;
mod error;
mod event;
mod watcher;
mod registry;
mod readiness;
mod reconciler;

pub use config::{WatchConfig, RetryPolicy};
pub use error::{WaitError, ReconcileError};
pub use event::{ChangeEvent, ChangeKind};
pub use watcher::{
    ChangeWatcher, MutationWatcher, SummaryWatcher, Summary, BurstCallback, SummaryCallback,
};
pub use registry::{WatcherRegistry, WatcherKind};
pub use readiness::{ReadinessWaiter, BurstNotifier, WaitFuture, retry_with_delay};
pub use reconciler::{MutationReconciler, ReconcileRequest, Reconciled, Candidate, Action};
