//! Change watchers
//!
//! The host offers two kinds of notifications: raw per-mutation batches, and
//! per-query summaries of which matching nodes appeared or went away. Both
//! are exposed through [`ChangeWatcher`] so registries and waiters never care
//! which one they hold.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use graft_dom::{Document, MutationObserverInit, MutationRecord, NodeId, ObserverId};
use graft_query::Filter;
use smol::channel::Sender;

use crate::ChangeEvent;

/// Uniform observe/disconnect contract
pub trait ChangeWatcher {
    /// Start (or restart) watching. No-op while already watching.
    fn observe(&self);

    /// Stop watching. No-op when already stopped.
    fn disconnect(&self);

    fn is_observing(&self) -> bool;
}

/// Receives every burst delivered to a [`MutationWatcher`]
pub type BurstCallback = Rc<dyn Fn(&[ChangeEvent])>;

/// Receives non-empty summaries from a [`SummaryWatcher`]
pub type SummaryCallback = Rc<dyn Fn(&Summary)>;

/// Per-mutation watcher over a document observer
pub struct MutationWatcher {
    document: Rc<Document>,
    target: NodeId,
    options: MutationObserverInit,
    callback: BurstCallback,
    observer: Cell<Option<ObserverId>>,
}

impl MutationWatcher {
    pub fn new(
        document: Rc<Document>,
        target: NodeId,
        options: MutationObserverInit,
        callback: BurstCallback,
    ) -> Rc<Self> {
        Rc::new(Self {
            document,
            target,
            options,
            callback,
            observer: Cell::new(None),
        })
    }

    pub fn target(&self) -> NodeId {
        self.target
    }
}

impl ChangeWatcher for MutationWatcher {
    fn observe(&self) {
        if self.is_observing() {
            return;
        }
        let callback = Rc::clone(&self.callback);
        let id = self.document.observe(
            self.target,
            self.options.clone(),
            Rc::new(move |records: &[MutationRecord]| {
                let events = ChangeEvent::from_records(records);
                if !events.is_empty() {
                    callback(&events);
                }
            }),
        );
        self.observer.set(Some(id));
    }

    fn disconnect(&self) {
        if let Some(id) = self.observer.take() {
            self.document.disconnect(id);
        }
    }

    fn is_observing(&self) -> bool {
        self.observer.get().is_some_and(|id| self.document.is_observing(id))
    }
}

/// What changed for a query since the previous batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Newly matching nodes
    pub added: Vec<NodeId>,
    /// Nodes that no longer match or left the subtree
    pub removed: Vec<NodeId>,
    /// Still-matching nodes whose hidden attribute was just cleared
    pub revealed: Vec<NodeId>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.revealed.is_empty()
    }
}

/// Per-query watcher: reports matching nodes appearing below a root
pub struct SummaryWatcher {
    document: Rc<Document>,
    root: NodeId,
    query: Filter,
    hidden_attribute: String,
    callback: SummaryCallback,
    observer: Cell<Option<ObserverId>>,
    known: Rc<RefCell<Vec<NodeId>>>,
}

impl SummaryWatcher {
    pub fn new(
        document: Rc<Document>,
        root: NodeId,
        query: Filter,
        hidden_attribute: &str,
        callback: SummaryCallback,
    ) -> Rc<Self> {
        Rc::new(Self {
            document,
            root,
            query,
            hidden_attribute: hidden_attribute.to_string(),
            callback,
            observer: Cell::new(None),
            known: Rc::new(RefCell::new(Vec::new())),
        })
    }

    fn matching(document: &Document, root: NodeId, query: &Filter) -> Vec<NodeId> {
        let tree = document.tree();
        query.apply(&tree, &tree.descendants(root))
    }
}

impl ChangeWatcher for SummaryWatcher {
    fn observe(&self) {
        if self.is_observing() {
            return;
        }
        // Baseline: nodes already present are not reported as added
        *self.known.borrow_mut() = Self::matching(&self.document, self.root, &self.query);

        let document = Rc::downgrade(&self.document);
        let root = self.root;
        let query = self.query.clone();
        let hidden = self.hidden_attribute.clone();
        let known = Rc::clone(&self.known);
        let callback = Rc::clone(&self.callback);

        let id = self.document.observe(
            self.root,
            MutationObserverInit {
                child_list: true,
                attributes: true,
                subtree: true,
                attribute_old_value: true,
                attribute_filter: None,
            },
            Rc::new(move |records: &[MutationRecord]| {
                let Some(document) = document.upgrade() else { return };
                let current = Self::matching(&document, root, &query);
                let summary = {
                    let mut known = known.borrow_mut();
                    let added: Vec<NodeId> =
                        current.iter().copied().filter(|n| !known.contains(n)).collect();
                    let removed: Vec<NodeId> =
                        known.iter().copied().filter(|n| !current.contains(n)).collect();

                    let tree = document.tree();
                    let mut revealed = Vec::new();
                    for event in ChangeEvent::from_records(records) {
                        let node = event.target;
                        if event.cleared_attribute(&hidden)
                            && !tree.has_attribute(node, &hidden)
                            && current.contains(&node)
                            && !added.contains(&node)
                            && !revealed.contains(&node)
                        {
                            revealed.push(node);
                        }
                    }
                    *known = current;
                    Summary { added, removed, revealed }
                };
                if !summary.is_empty() {
                    tracing::trace!(
                        "Summary below {}: +{} -{} revealed {}",
                        root,
                        summary.added.len(),
                        summary.removed.len(),
                        summary.revealed.len()
                    );
                    callback(&summary);
                }
            }),
        );
        self.observer.set(Some(id));
    }

    fn disconnect(&self) {
        if let Some(id) = self.observer.take() {
            self.document.disconnect(id);
        }
        self.known.borrow_mut().clear();
    }

    fn is_observing(&self) -> bool {
        self.observer.get().is_some_and(|id| self.document.is_observing(id))
    }
}

/// Sending end shared between a watcher's callback and its registration.
/// Once closed, the receiving side sees the channel end.
pub(crate) struct Outlet<T> {
    sender: RefCell<Option<Sender<T>>>,
}

impl<T> Outlet<T> {
    pub(crate) fn new(sender: Sender<T>) -> Rc<Self> {
        Rc::new(Self { sender: RefCell::new(Some(sender)) })
    }

    /// False once closed or full
    pub(crate) fn send(&self, value: T) -> bool {
        self.sender.borrow().as_ref().is_some_and(|s| s.try_send(value).is_ok())
    }

    pub(crate) fn close(&self) {
        self.sender.borrow_mut().take();
    }
}

/// Registration handle for a waiting watcher: disconnecting it, from the
/// registry or from the waiter itself, also closes the waiter's channel.
pub(crate) struct ClosingWatcher<T> {
    inner: Rc<dyn ChangeWatcher>,
    outlet: Rc<Outlet<T>>,
}

impl<T: 'static> ClosingWatcher<T> {
    pub(crate) fn new(inner: Rc<dyn ChangeWatcher>, outlet: Rc<Outlet<T>>) -> Rc<dyn ChangeWatcher> {
        Rc::new(Self { inner, outlet })
    }
}

impl<T> ChangeWatcher for ClosingWatcher<T> {
    fn observe(&self) {
        self.inner.observe();
    }

    fn disconnect(&self) {
        self.outlet.close();
        self.inner.disconnect();
    }

    fn is_observing(&self) -> bool {
        self.inner.is_observing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closing_watcher_ends_channel() {
        let doc = Document::new();
        let (sender, receiver) = smol::channel::unbounded();
        let outlet = Outlet::new(sender);
        let sink = Rc::clone(&outlet);
        let inner = MutationWatcher::new(
            Rc::clone(&doc),
            doc.root(),
            MutationObserverInit { child_list: true, subtree: true, ..Default::default() },
            Rc::new(move |events: &[ChangeEvent]| {
                sink.send(events.len());
            }),
        );
        let watcher = ClosingWatcher::new(inner.clone(), outlet);
        watcher.observe();

        attached(&doc, doc.root(), "div");
        doc.flush();
        watcher.disconnect();

        assert!(!inner.is_observing());
        assert_eq!(receiver.try_recv(), Ok(1));
        assert!(receiver.is_closed());
        assert!(receiver.try_recv().is_err());
    }

    fn attached(doc: &Document, parent: NodeId, tag: &str) -> NodeId {
        let node = doc.create_element(tag);
        doc.append_child(parent, node).unwrap();
        node
    }

    #[test]
    fn test_mutation_watcher_observe_is_idempotent() {
        let doc = Document::new();
        let container = attached(&doc, doc.root(), "div");
        let bursts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&bursts);
        let watcher = MutationWatcher::new(
            Rc::clone(&doc),
            container,
            MutationObserverInit { child_list: true, ..Default::default() },
            Rc::new(move |events: &[ChangeEvent]| sink.borrow_mut().push(events.len())),
        );

        watcher.observe();
        watcher.observe();
        attached(&doc, container, "span");
        doc.flush();
        // One underlying observer, so one burst
        assert_eq!(*bursts.borrow(), vec![1]);

        watcher.disconnect();
        watcher.disconnect();
        assert!(!watcher.is_observing());
        attached(&doc, container, "span");
        doc.flush();
        assert_eq!(bursts.borrow().len(), 1);

        // Restart after disconnect
        watcher.observe();
        attached(&doc, container, "span");
        doc.flush();
        assert_eq!(bursts.borrow().len(), 2);
    }

    #[test]
    fn test_summary_reports_added_removed_revealed() {
        let doc = Document::new();
        let menu = attached(&doc, doc.root(), "div");
        let existing = attached(&doc, menu, "button");
        doc.set_hidden(existing, true).unwrap();

        let summaries = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&summaries);
        let watcher = SummaryWatcher::new(
            Rc::clone(&doc),
            menu,
            Filter::tag("button"),
            "hidden",
            Rc::new(move |summary: &Summary| sink.borrow_mut().push(summary.clone())),
        );
        watcher.observe();

        // Unrelated change: no summary
        attached(&doc, menu, "span");
        doc.flush();
        assert!(summaries.borrow().is_empty());

        let fresh = attached(&doc, menu, "button");
        doc.set_hidden(existing, false).unwrap();
        doc.flush();

        doc.remove_child(menu, fresh).unwrap();
        doc.flush();

        let summaries = summaries.borrow();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].added, vec![fresh]);
        assert_eq!(summaries[0].revealed, vec![existing]);
        assert_eq!(summaries[1].removed, vec![fresh]);
    }
}
