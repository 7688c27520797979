//! Change events
//!
//! Flattened view of mutation records: one event per added node, per removed
//! node and per attribute change, in delivery order.

use graft_dom::{MutationRecord, MutationType, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    AttributeChanged { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Added/removed node, or the element whose attribute changed
    pub target: NodeId,
    pub kind: ChangeKind,
    /// Attribute value before the change, when recorded
    pub previous_value: Option<String>,
}

impl ChangeEvent {
    pub fn from_records(records: &[MutationRecord]) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        for record in records {
            match record.mutation_type {
                MutationType::ChildList => {
                    events.extend(record.removed_nodes.iter().map(|&target| ChangeEvent {
                        target,
                        kind: ChangeKind::Removed,
                        previous_value: None,
                    }));
                    events.extend(record.added_nodes.iter().map(|&target| ChangeEvent {
                        target,
                        kind: ChangeKind::Added,
                        previous_value: None,
                    }));
                }
                MutationType::Attributes => {
                    if let Some(name) = &record.attribute_name {
                        events.push(ChangeEvent {
                            target: record.target,
                            kind: ChangeKind::AttributeChanged { name: name.clone() },
                            previous_value: record.old_value.clone(),
                        });
                    }
                }
            }
        }
        events
    }

    pub fn is_added(&self) -> bool {
        self.kind == ChangeKind::Added
    }

    /// Attribute `name` changed and was present before. Whether it is absent
    /// now has to be checked against the tree.
    pub fn cleared_attribute(&self, name: &str) -> bool {
        matches!(&self.kind, ChangeKind::AttributeChanged { name: changed } if changed == name)
            && self.previous_value.is_some()
    }
}
