//! Mutation Observer
//!
//! Observe DOM changes. Records are queued per observer when the mutation
//! happens and handed to the observer's callback as one batch on the next
//! `Document::flush`.

use std::rc::Rc;

use crate::{DomTree, NodeId};

/// Mutation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    ChildList,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes: added,
            removed_nodes: removed,
            attribute_name: None,
            old_value: None,
        }
    }

    pub fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }
}

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

/// Callback receiving one delivered batch
pub type MutationCallback = Rc<dyn Fn(&[MutationRecord])>;

/// Observer handle issued by `Document::observe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

pub(crate) struct MutationObserver {
    id: ObserverId,
    target: NodeId,
    options: MutationObserverInit,
    callback: MutationCallback,
    pending: Vec<MutationRecord>,
}

impl MutationObserver {
    fn interested(&self, tree: &DomTree, mutation: &MutationRecord) -> bool {
        let matches_target = if self.options.subtree {
            tree.is_inclusive_ancestor(self.target, mutation.target)
        } else {
            self.target == mutation.target
        };
        let matches_type = match mutation.mutation_type {
            MutationType::Attributes => self.options.attributes,
            MutationType::ChildList => self.options.child_list,
        };
        let passes_filter = match (&self.options.attribute_filter, &mutation.attribute_name) {
            (Some(filter), Some(attr)) => filter.contains(attr),
            _ => true,
        };
        matches_target && matches_type && passes_filter
    }
}

/// All live observers of one document
#[derive(Default)]
pub(crate) struct ObserverSet {
    observers: Vec<MutationObserver>,
    next_id: u64,
}

impl ObserverSet {
    pub(crate) fn create(
        &mut self,
        target: NodeId,
        options: MutationObserverInit,
        callback: MutationCallback,
    ) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.push(MutationObserver {
            id,
            target,
            options,
            callback,
            pending: Vec::new(),
        });
        id
    }

    /// Drop an observer and its undelivered records. Returns false if unknown.
    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        before != self.observers.len()
    }

    pub(crate) fn contains(&self, id: ObserverId) -> bool {
        self.observers.iter().any(|o| o.id == id)
    }

    /// Queue a mutation on every interested observer
    pub(crate) fn notify(&mut self, tree: &DomTree, mutation: &MutationRecord) {
        for observer in &mut self.observers {
            if observer.interested(tree, mutation) {
                let mut record = mutation.clone();
                if !observer.options.attribute_old_value
                    && record.mutation_type == MutationType::Attributes
                {
                    record.old_value = None;
                }
                observer.pending.push(record);
            }
        }
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.observers.iter().map(|o| o.pending.len()).sum()
    }

    /// Take the next non-empty batch, in observer creation order
    pub(crate) fn take_next_batch(&mut self) -> Option<(ObserverId, MutationCallback, Vec<MutationRecord>)> {
        let observer = self.observers.iter_mut().find(|o| !o.pending.is_empty())?;
        Some((
            observer.id,
            Rc::clone(&observer.callback),
            std::mem::take(&mut observer.pending),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn noop() -> MutationCallback {
        Rc::new(|_: &[MutationRecord]| {})
    }

    #[test]
    fn test_attribute_filter_and_old_value() {
        let mut tree = DomTree::new();
        let node = tree.create_element("div");
        tree.append_child(tree.root(), node).unwrap();

        let mut set = ObserverSet::default();
        set.create(node, MutationObserverInit {
            attributes: true,
            attribute_filter: Some(vec!["hidden".to_string()]),
            ..Default::default()
        }, noop());

        set.notify(&tree, &MutationRecord::attribute(node, "class", None));
        assert_eq!(set.pending_len(), 0);

        set.notify(&tree, &MutationRecord::attribute(node, "hidden", Some(String::new())));
        let (_, _, records) = set.take_next_batch().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attribute_name.as_deref(), Some("hidden"));
        // attribute_old_value was not requested
        assert_eq!(records[0].old_value, None);
    }

    #[test]
    fn test_subtree_scope() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        let elsewhere = tree.create_element("div");
        tree.append_child(tree.root(), outer).unwrap();
        tree.append_child(outer, inner).unwrap();
        tree.append_child(tree.root(), elsewhere).unwrap();

        let mut set = ObserverSet::default();
        let shallow = set.create(outer, MutationObserverInit {
            child_list: true,
            ..Default::default()
        }, noop());
        let deep = set.create(outer, MutationObserverInit {
            child_list: true,
            subtree: true,
            ..Default::default()
        }, noop());

        set.notify(&tree, &MutationRecord::child_list(inner, vec![], vec![]));
        set.notify(&tree, &MutationRecord::child_list(elsewhere, vec![], vec![]));

        let (id, _, records) = set.take_next_batch().unwrap();
        assert_eq!(id, deep);
        assert_eq!(records.len(), 1);
        assert!(set.take_next_batch().is_none());

        assert!(set.remove(shallow));
        assert!(!set.remove(shallow));
    }

    #[test]
    fn test_remove_drops_pending() {
        let tree = DomTree::new();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let mut set = ObserverSet::default();
        let id = set.create(tree.root(), MutationObserverInit {
            child_list: true,
            ..Default::default()
        }, Rc::new(move |_: &[MutationRecord]| seen.set(seen.get() + 1)));

        set.notify(&tree, &MutationRecord::child_list(tree.root(), vec![], vec![]));
        assert_eq!(set.pending_len(), 1);
        set.remove(id);
        assert_eq!(set.pending_len(), 0);
        assert_eq!(calls.get(), 0);
    }
}
