//! Burst reconciliation
//!
//! Opening a host menu produces a burst of mutations in which the entry we
//! want can show up two ways: freshly added, or already present and just
//! un-hidden. The reconciler hides the container while the host works,
//! collects the whole burst, picks exactly one node and acts on it once.
//!
//! "Added" always beats "revealed": the host adds the item wrapper before it
//! swaps the icon, so an added match is the earlier and more specific signal.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use graft_dom::{Document, MutationObserverInit, NodeId};
use graft_query::{Filter, SearchResult};
use smol::Timer;
use smol::channel::{Receiver, Sender};
use smol::future::FutureExt;

use crate::watcher::{ClosingWatcher, Outlet};
use crate::{ChangeEvent, ChangeWatcher, MutationWatcher, ReconcileError, WatchConfig, WatcherRegistry};

/// Action run on the resolved node
pub type Action = Box<dyn FnOnce(&Document, NodeId)>;

/// One reconciliation
pub struct ReconcileRequest {
    /// Subtree to watch; hidden while the request runs
    pub container: NodeId,
    /// What the wanted node looks like
    pub target: Filter,
    /// Clickable ancestor an added match resolves to
    pub wrapper: Filter,
    /// Defaults to activating (clicking) the node
    pub action: Option<Action>,
}

impl ReconcileRequest {
    pub fn new(container: NodeId, target: Filter, wrapper: Filter) -> Self {
        Self { container, target, wrapper, action: None }
    }

    pub fn with_action(mut self, action: impl FnOnce(&Document, NodeId) + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }
}

/// How the node was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Added,
    Revealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// Node the action ran on
    pub node: NodeId,
    pub via: Candidate,
}

/// Picks one node per burst and acts on it. Requests are served one at a
/// time, in call order.
pub struct MutationReconciler {
    document: Rc<Document>,
    registry: Rc<WatcherRegistry>,
    config: WatchConfig,
    gate: FifoGate,
}

impl MutationReconciler {
    pub fn new(document: Rc<Document>, registry: Rc<WatcherRegistry>, config: WatchConfig) -> Self {
        Self {
            document,
            registry,
            config,
            gate: FifoGate::default(),
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Hide, watch, resolve, act, restore.
    ///
    /// On every exit path (including cancellation of the returned future)
    /// the container is made visible again and the watcher is removed.
    pub async fn observe_and_reconcile(&self, request: ReconcileRequest) -> Result<Reconciled, ReconcileError> {
        let _turn = self.gate.enter().await;
        let ReconcileRequest { container, target, wrapper, action } = request;
        let hidden = self.config.hidden_attribute.as_str();

        let was_hidden = self.document.tree().has_attribute(container, hidden);
        self.document.set_attribute(container, hidden, "")?;
        let mut restore = Restore {
            document: &self.document,
            registry: &self.registry,
            watcher_id: &self.config.watcher_id,
            hidden_attribute: hidden,
            container,
            was_hidden,
            watcher: None,
        };

        let (sender, receiver) = smol::channel::unbounded();
        let outlet = Outlet::new(sender);
        let inner = MutationWatcher::new(
            Rc::clone(&self.document),
            container,
            MutationObserverInit {
                child_list: true,
                attributes: true,
                subtree: true,
                attribute_old_value: true,
                attribute_filter: Some(vec![hidden.to_string()]),
            },
            burst_sink(Rc::clone(&outlet)),
        );
        // Disconnecting the registration (e.g. `disconnect_all`) closes the
        // channel and ends the request
        let watcher = ClosingWatcher::new(inner, outlet);
        restore.watcher = Some(Rc::clone(&watcher));
        self.registry.upsert_oneshot(&self.config.watcher_id, Rc::clone(&watcher));
        watcher.observe();

        let burst = self.collect_burst(&receiver).await?;
        tracing::trace!("Burst of {} events below {}", burst.len(), container);

        let Some(reconciled) = self.resolve(container, &burst, &target, &wrapper) else {
            tracing::warn!("No candidate in burst of {} events below {}", burst.len(), container);
            return Err(ReconcileError::NoCandidate { events: burst.len() });
        };

        tracing::debug!("Reconciled {:?} candidate {}", reconciled.via, reconciled.node);
        match action {
            Some(action) => action(&self.document, reconciled.node),
            None => {
                self.document.activate(reconciled.node);
            }
        }
        drop(restore);
        Ok(reconciled)
    }

    /// Wait for a first batch, then keep extending the burst until the quiet
    /// window passes without a new one
    async fn collect_burst(&self, receiver: &Receiver<Vec<ChangeEvent>>) -> Result<Vec<ChangeEvent>, ReconcileError> {
        let max_wait = self.config.max_wait;
        let mut burst = match next_batch(receiver, max_wait).await {
            Next::Batch(batch) => batch,
            Next::Quiet => {
                tracing::warn!("No change within {:?}", max_wait);
                return Err(ReconcileError::TimedOut(max_wait));
            }
            Next::Closed => return Err(disconnected()),
        };
        loop {
            match next_batch(receiver, self.config.quiet_window).await {
                Next::Batch(batch) => burst.extend(batch),
                Next::Quiet => return Ok(burst),
                Next::Closed => return Err(disconnected()),
            }
        }
    }

    fn resolve(
        &self,
        container: NodeId,
        burst: &[ChangeEvent],
        target: &Filter,
        wrapper: &Filter,
    ) -> Option<Reconciled> {
        let tree = self.document.tree();
        let attached = |node: NodeId| node != container && tree.is_inclusive_ancestor(container, node);

        for event in burst.iter().filter(|e| e.is_added() && attached(e.target)) {
            let subtree = std::iter::once(event.target).chain(tree.descendants(event.target));
            for candidate in subtree.filter(|&n| target.matches(&tree, n)) {
                let found = SearchResult::new(&tree, Some(candidate))
                    .into_ascending_search(true)
                    .find(wrapper)
                    .consume();
                if let Some(node) = found.filter(|&n| attached(n)) {
                    return Some(Reconciled { node, via: Candidate::Added });
                }
            }
        }

        let hidden = self.config.hidden_attribute.as_str();
        burst
            .iter()
            .filter(|e| e.cleared_attribute(hidden))
            .map(|e| e.target)
            .find(|&node| attached(node) && !tree.has_attribute(node, hidden) && target.matches(&tree, node))
            .map(|node| Reconciled { node, via: Candidate::Revealed })
    }
}

fn burst_sink(outlet: Rc<Outlet<Vec<ChangeEvent>>>) -> crate::BurstCallback {
    Rc::new(move |events: &[ChangeEvent]| {
        outlet.send(events.to_vec());
    })
}

fn disconnected() -> ReconcileError {
    tracing::warn!("Reconciler watcher disconnected while collecting");
    ReconcileError::Cancelled
}

enum Next {
    Batch(Vec<ChangeEvent>),
    /// `limit` passed without a batch
    Quiet,
    /// Watcher disconnected and every queued batch consumed
    Closed,
}

async fn next_batch(receiver: &Receiver<Vec<ChangeEvent>>, limit: std::time::Duration) -> Next {
    async {
        match receiver.recv().await {
            Ok(batch) => Next::Batch(batch),
            Err(_) => Next::Closed,
        }
    }
    .or(async {
        Timer::after(limit).await;
        Next::Quiet
    })
    .await
}

/// Restores visibility and drops the watcher when a request ends
struct Restore<'a> {
    document: &'a Document,
    registry: &'a WatcherRegistry,
    watcher_id: &'a str,
    hidden_attribute: &'a str,
    container: NodeId,
    was_hidden: bool,
    watcher: Option<Rc<dyn ChangeWatcher>>,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            self.registry.remove_oneshot_if(self.watcher_id, &watcher);
            watcher.disconnect();
        }
        if !self.was_hidden {
            if let Err(err) = self.document.remove_attribute(self.container, self.hidden_attribute) {
                tracing::warn!("Could not unhide {}: {}", self.container, err);
            }
        }
    }
}

/// Strict FIFO admission: one holder at a time, the turn is handed directly
/// to the oldest waiter.
#[derive(Default)]
struct FifoGate {
    busy: Cell<bool>,
    waiting: RefCell<VecDeque<Sender<()>>>,
}

impl FifoGate {
    async fn enter(&self) -> GateTurn<'_> {
        if self.busy.replace(true) {
            let (sender, receiver) = smol::channel::bounded(1);
            self.waiting.borrow_mut().push_back(sender);
            // The previous holder keeps `busy` set while handing over
            let _ = receiver.recv().await;
        }
        GateTurn { gate: self }
    }

    fn leave(&self) {
        loop {
            let next = self.waiting.borrow_mut().pop_front();
            match next {
                Some(sender) => {
                    // A waiter whose future was dropped can't take the turn
                    if sender.try_send(()).is_ok() {
                        return;
                    }
                }
                None => {
                    self.busy.set(false);
                    return;
                }
            }
        }
    }
}

struct GateTurn<'a> {
    gate: &'a FifoGate,
}

impl Drop for GateTurn<'_> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}
