//! Readiness waiting
//!
//! Resolve with a node as soon as a query finds one: immediately if it
//! already does, otherwise on the first change burst after which it does.
//! A retry mode polls instead, for content that changes without any
//! observable mutation.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::time::Duration;

use graft_dom::NodeId;
use smol::Timer;
use smol::future::FutureExt;

use crate::watcher::{ClosingWatcher, Outlet};
use crate::{ChangeWatcher, RetryPolicy, WaitError, WatcherRegistry};

/// Called by the watcher on every burst; re-runs the query
pub type BurstNotifier = Rc<dyn Fn()>;

/// Future returned by [`ReadinessWaiter::run`]
pub type WaitFuture = Pin<Box<dyn Future<Output = Result<NodeId, WaitError>>>>;

type QueryFn = Rc<dyn Fn() -> Option<NodeId>>;
type ObserveFn = Box<dyn FnOnce(BurstNotifier) -> Rc<dyn ChangeWatcher>>;

/// Builder for one wait
#[derive(Default)]
pub struct ReadinessWaiter {
    query: Option<QueryFn>,
    observe: Option<ObserveFn>,
    retry: Option<RetryPolicy>,
    registration: Option<(Rc<WatcherRegistry>, String)>,
    timeout: Option<Duration>,
}

impl ReadinessWaiter {
    pub fn build() -> Self {
        Self::default()
    }

    /// The query; `Some` means ready
    pub fn query_fn(mut self, query: impl Fn() -> Option<NodeId> + 'static) -> Self {
        self.query = Some(Rc::new(query));
        self
    }

    /// Creates the watcher that will call the given notifier on every burst.
    /// The waiter starts and stops it.
    pub fn observe_fn(
        mut self,
        observe: impl FnOnce(BurstNotifier) -> Rc<dyn ChangeWatcher> + 'static,
    ) -> Self {
        self.observe = Some(Box::new(observe));
        self
    }

    /// Poll instead of watching
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Track the watcher as a oneshot registration under `id`
    pub fn register_in(mut self, registry: Rc<WatcherRegistry>, id: &str) -> Self {
        self.registration = Some((registry, id.to_string()));
        self
    }

    /// Fail with [`WaitError::TimedOut`] if the watcher has not resolved in time
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate the builder and start waiting.
    ///
    /// Configuration errors are returned here, before anything is polled or
    /// observed.
    pub fn run(self) -> Result<WaitFuture, WaitError> {
        let query = self.query.ok_or(WaitError::NotConfigured("query_fn is required"))?;
        match (self.observe, self.retry) {
            (Some(_), Some(_)) => Err(WaitError::NotConfigured(
                "observe_fn and retry are mutually exclusive",
            )),
            (None, Some(policy)) => Ok(Box::pin(poll_query(query, policy))),
            (Some(observe), None) => Ok(Box::pin(watch_query(
                query,
                observe,
                self.registration,
                self.timeout,
            ))),
            (None, None) => Err(WaitError::NotConfigured("observe_fn or retry is required")),
        }
    }
}

async fn poll_query(query: QueryFn, policy: RetryPolicy) -> Result<NodeId, WaitError> {
    retry_with_delay(policy, || query().ok_or(WaitError::NotReady))
        .await
        .map_err(|_| WaitError::Exhausted { attempts: policy.attempts.max(1) })
}

async fn watch_query(
    query: QueryFn,
    observe: ObserveFn,
    registration: Option<(Rc<WatcherRegistry>, String)>,
    timeout: Option<Duration>,
) -> Result<NodeId, WaitError> {
    if let Some(node) = query() {
        return Ok(node);
    }

    let (sender, receiver) = smol::channel::bounded(1);
    let outlet = Outlet::new(sender);
    // Lets the notifier stop its own watcher without keeping it alive
    let own: Rc<RefCell<Option<Weak<dyn ChangeWatcher>>>> = Rc::default();

    let notifier: BurstNotifier = {
        let query = Rc::clone(&query);
        let outlet = Rc::clone(&outlet);
        let own = Rc::clone(&own);
        Rc::new(move || {
            let Some(node) = query() else { return };
            if outlet.send(node) {
                let watcher = own.borrow().as_ref().and_then(Weak::upgrade);
                if let Some(watcher) = watcher {
                    watcher.disconnect();
                }
            }
        })
    };

    let inner = observe(notifier);
    *own.borrow_mut() = Some(Rc::downgrade(&inner));
    // Disconnecting this one, e.g. through the registry, ends the wait
    let watcher = ClosingWatcher::new(inner, outlet);
    let cleanup = WaitCleanup { watcher: Rc::clone(&watcher), registration };
    if let Some((registry, id)) = &cleanup.registration {
        registry.upsert_oneshot(id, Rc::clone(&watcher));
    }
    watcher.observe();

    // The query may have turned ready before the watcher was in place
    if let Some(node) = query() {
        return Ok(node);
    }

    let received = async { receiver.recv().await.map_err(|_| WaitError::Cancelled) };
    let outcome = match timeout {
        Some(limit) => {
            received
                .or(async {
                    Timer::after(limit).await;
                    Err(WaitError::TimedOut(limit))
                })
                .await
        }
        None => received.await,
    };
    if let Err(err) = &outcome {
        tracing::debug!("Readiness wait ended without a match: {}", err);
    }
    outcome
}

/// Stops and unregisters a wait's watcher however the wait ends, including
/// when its future is dropped
struct WaitCleanup {
    watcher: Rc<dyn ChangeWatcher>,
    registration: Option<(Rc<WatcherRegistry>, String)>,
}

impl Drop for WaitCleanup {
    fn drop(&mut self) {
        if let Some((registry, id)) = &self.registration {
            registry.remove_oneshot_if(id, &self.watcher);
        }
        self.watcher.disconnect();
    }
}

/// Run `operation` up to `policy.attempts` times, sleeping `policy.delay`
/// between attempts. Returns the first success or the last error.
pub async fn retry_with_delay<T, E>(
    policy: RetryPolicy,
    mut operation: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                tracing::debug!("Giving up after {} attempts", attempts);
                return Err(err);
            }
            Err(_) => {
                tracing::trace!("Attempt {}/{} failed, retrying in {:?}", attempt, attempts, policy.delay);
                Timer::after(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
