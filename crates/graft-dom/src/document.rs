//! Document - Shared host handle
//!
//! Single-threaded: the document is shared as `Rc<Document>` and every
//! accessor borrows the tree only for the duration of the call. Observer
//! callbacks and activation listeners run with no borrow held, so they may
//! read, mutate, observe and disconnect freely.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::mutation::ObserverSet;
use crate::{
    DomResult, DomTree, MutationCallback, MutationObserverInit, MutationRecord, NodeId, ObserverId,
};

/// Attribute marking a node as hidden
pub const HIDDEN_ATTRIBUTE: &str = "hidden";

/// Callback fired when a node (or one of its descendants) is activated
pub type ActivationListener = Rc<dyn Fn(NodeId)>;

/// HTML Document
pub struct Document {
    tree: RefCell<DomTree>,
    observers: RefCell<ObserverSet>,
    listeners: RefCell<Vec<(NodeId, ActivationListener)>>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            tree: RefCell::new(DomTree::new()),
            observers: RefCell::new(ObserverSet::default()),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Borrow the tree for reading.
    ///
    /// Do not hold the guard across a mutating call on the same document.
    pub fn tree(&self) -> Ref<'_, DomTree> {
        self.tree.borrow()
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Create a detached element (not observable until attached)
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.tree.borrow_mut().create_element(tag)
    }

    /// Create a detached text node
    pub fn create_text(&self, text: &str) -> NodeId {
        self.tree.borrow_mut().create_text(text)
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        let mut tree = self.tree.borrow_mut();
        let old_parent = tree.insert_before(parent, child, reference)?;
        let mut observers = self.observers.borrow_mut();
        if let Some(old_parent) = old_parent {
            observers.notify(&tree, &MutationRecord::child_list(old_parent, Vec::new(), vec![child]));
        }
        observers.notify(&tree, &MutationRecord::child_list(parent, vec![child], Vec::new()));
        Ok(())
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let mut tree = self.tree.borrow_mut();
        tree.remove_child(parent, child)?;
        self.observers
            .borrow_mut()
            .notify(&tree, &MutationRecord::child_list(parent, Vec::new(), vec![child]));
        Ok(())
    }

    /// Set an attribute. Records a mutation even if the value is unchanged.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let mut tree = self.tree.borrow_mut();
        let old_value = tree.set_attribute(node, name, value)?;
        self.observers
            .borrow_mut()
            .notify(&tree, &MutationRecord::attribute(node, name, old_value));
        Ok(())
    }

    /// Remove an attribute. Absent attributes produce no record.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> DomResult<()> {
        let mut tree = self.tree.borrow_mut();
        if let Some(old_value) = tree.remove_attribute(node, name)? {
            self.observers
                .borrow_mut()
                .notify(&tree, &MutationRecord::attribute(node, name, Some(old_value)));
        }
        Ok(())
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.tree().get_attribute(node, name).map(str::to_string)
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.tree().has_attribute(node, HIDDEN_ATTRIBUTE)
    }

    pub fn set_hidden(&self, node: NodeId, hidden: bool) -> DomResult<()> {
        if hidden {
            self.set_attribute(node, HIDDEN_ATTRIBUTE, "")
        } else {
            self.remove_attribute(node, HIDDEN_ATTRIBUTE)
        }
    }

    /// Start observing `target`
    pub fn observe(
        &self,
        target: NodeId,
        options: MutationObserverInit,
        callback: MutationCallback,
    ) -> ObserverId {
        let id = self.observers.borrow_mut().create(target, options, callback);
        tracing::trace!("Observer {:?} attached to {}", id, target);
        id
    }

    /// Stop an observer and drop its undelivered records. Idempotent.
    pub fn disconnect(&self, id: ObserverId) {
        if self.observers.borrow_mut().remove(id) {
            tracing::trace!("Observer {:?} disconnected", id);
        }
    }

    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.observers.borrow().contains(id)
    }

    /// Records queued but not yet delivered
    pub fn pending_records(&self) -> usize {
        self.observers.borrow().pending_len()
    }

    /// Deliver queued records, one batch per observer, until nothing is
    /// pending. Records produced by callbacks are delivered in the same call.
    ///
    /// Returns the number of batches delivered.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.observers.borrow_mut().take_next_batch();
            let Some((id, callback, records)) = next else { break };
            tracing::trace!("Delivering {} records to observer {:?}", records.len(), id);
            callback(&records);
            delivered += 1;
        }
        delivered
    }

    /// Listen for activation of `node` or any of its descendants
    pub fn add_activation_listener(&self, node: NodeId, listener: ActivationListener) {
        self.listeners.borrow_mut().push((node, listener));
    }

    /// Simulate activation (a click) on `node`.
    ///
    /// Listeners on the node and its ancestors fire innermost first. Returns
    /// how many listeners ran.
    pub fn activate(&self, node: NodeId) -> usize {
        let to_run: Vec<ActivationListener> = {
            let tree = self.tree.borrow();
            let listeners = self.listeners.borrow();
            let mut to_run = Vec::new();
            let mut current = Some(node);
            while let Some(id) = current {
                for (target, listener) in listeners.iter() {
                    if *target == id {
                        to_run.push(Rc::clone(listener));
                    }
                }
                current = tree.parent(id);
            }
            to_run
        };
        tracing::debug!("Activating {} ({} listeners)", node, to_run.len());
        for listener in &to_run {
            listener(node);
        }
        to_run.len()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.borrow().len())
            .field("pending_records", &self.pending_records())
            .finish()
    }
}
