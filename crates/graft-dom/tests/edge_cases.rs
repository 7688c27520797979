//! Edge case tests for graft-dom
//!
//! Moves, re-entrant observers and activation over the host document.

use std::cell::RefCell;
use std::rc::Rc;

use graft_dom::{Document, DomError, DomTree, MutationObserverInit, MutationRecord, MutationType, NodeId};

fn element(doc: &Document, parent: NodeId, tag: &str) -> NodeId {
    let node = doc.create_element(tag);
    doc.append_child(parent, node).unwrap();
    node
}

fn recorder() -> (Rc<RefCell<Vec<MutationRecord>>>, graft_dom::MutationCallback) {
    let records = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&records);
    (records, Rc::new(move |batch: &[MutationRecord]| sink.borrow_mut().extend_from_slice(batch)))
}

// ============================================================================
// TREE EDGE CASES
// ============================================================================

#[test]
fn test_cannot_insert_ancestor_into_descendant() {
    let mut tree = DomTree::new();
    let outer = tree.create_element("div");
    let inner = tree.create_element("div");
    tree.append_child(tree.root(), outer).unwrap();
    tree.append_child(outer, inner).unwrap();

    assert_eq!(
        tree.append_child(inner, outer),
        Err(DomError::HierarchyRequest { parent: inner, child: outer })
    );
    assert_eq!(tree.parent(inner), Some(outer));
}

#[test]
fn test_remove_non_child_is_rejected() {
    let mut tree = DomTree::new();
    let a = tree.create_element("div");
    let b = tree.create_element("div");
    tree.append_child(tree.root(), a).unwrap();

    assert_eq!(tree.remove_child(a, b), Err(DomError::NotAChild { parent: a, child: b }));
}

#[test]
fn test_text_nodes_have_no_attributes() {
    let mut tree = DomTree::new();
    let text = tree.create_text("hello");

    assert_eq!(tree.set_attribute(text, "hidden", ""), Err(DomError::NotAnElement(text)));
    assert!(!tree.has_attribute(text, "hidden"));
    assert_eq!(tree.tag_name(text), None);
}

#[test]
fn test_deep_text_content() {
    let mut tree = DomTree::new();
    let mut parent = tree.root();
    for depth in 0..200 {
        let div = tree.create_element("div");
        tree.append_child(parent, div).unwrap();
        let text = tree.create_text(if depth % 2 == 0 { "a" } else { "b" });
        tree.append_child(div, text).unwrap();
        parent = div;
    }

    let all = tree.text_content(tree.root());
    assert_eq!(all.len(), 200);
    assert!(all.starts_with("abab"));
    assert_eq!(tree.descendants(tree.root()).len(), 200);
}

// ============================================================================
// OBSERVER EDGE CASES
// ============================================================================

#[test]
fn test_move_records_removal_then_addition() {
    let doc = Document::new();
    let from = element(&doc, doc.root(), "ul");
    let to = element(&doc, doc.root(), "ol");
    let item = element(&doc, from, "li");

    let (records, callback) = recorder();
    doc.observe(
        doc.root(),
        MutationObserverInit { child_list: true, subtree: true, ..Default::default() },
        callback,
    );
    doc.append_child(to, item).unwrap();
    doc.flush();

    let records = records.borrow();
    assert_eq!(records.len(), 2);
    assert_eq!((records[0].target, records[0].removed_nodes.clone()), (from, vec![item]));
    assert_eq!((records[1].target, records[1].added_nodes.clone()), (to, vec![item]));
}

#[test]
fn test_attribute_filter_and_old_values() {
    let doc = Document::new();
    let node = element(&doc, doc.root(), "div");

    let (records, callback) = recorder();
    doc.observe(
        node,
        MutationObserverInit {
            attributes: true,
            attribute_filter: Some(vec!["hidden".to_string()]),
            ..Default::default()
        },
        callback,
    );
    doc.set_attribute(node, "class", "menu").unwrap();
    doc.set_hidden(node, true).unwrap();
    doc.set_hidden(node, false).unwrap();
    // Already absent: nothing recorded
    doc.set_hidden(node, false).unwrap();
    doc.flush();

    let records = records.borrow();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.mutation_type == MutationType::Attributes));
    // Old values were not requested
    assert!(records.iter().all(|r| r.old_value.is_none()));
}

#[test]
fn test_disconnect_inside_callback() {
    let doc = Document::new();
    let calls = Rc::new(RefCell::new(0));

    let id = Rc::new(RefCell::new(None));
    let callback = {
        let doc = Rc::downgrade(&doc);
        let calls = Rc::clone(&calls);
        let id = Rc::clone(&id);
        Rc::new(move |_: &[MutationRecord]| {
            *calls.borrow_mut() += 1;
            if let (Some(doc), Some(id)) = (doc.upgrade(), *id.borrow()) {
                doc.disconnect(id);
            }
        })
    };
    *id.borrow_mut() = Some(doc.observe(
        doc.root(),
        MutationObserverInit { child_list: true, subtree: true, ..Default::default() },
        callback,
    ));

    element(&doc, doc.root(), "div");
    doc.flush();
    element(&doc, doc.root(), "div");
    doc.flush();

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(doc.pending_records(), 0);
}

#[test]
fn test_callback_mutations_delivered_in_same_flush() {
    let doc = Document::new();
    let list = element(&doc, doc.root(), "ul");
    let seen = Rc::new(RefCell::new(Vec::new()));

    let callback = {
        let doc = Rc::downgrade(&doc);
        let seen = Rc::clone(&seen);
        Rc::new(move |batch: &[MutationRecord]| {
            seen.borrow_mut().push(batch.len());
            let Some(doc) = doc.upgrade() else { return };
            // Echo once: the first batch adds a marker
            if seen.borrow().len() == 1 {
                element(&doc, list, "li");
            }
        })
    };
    doc.observe(list, MutationObserverInit { child_list: true, ..Default::default() }, callback);

    element(&doc, list, "li");
    assert_eq!(doc.flush(), 2);
    assert_eq!(*seen.borrow(), vec![1, 1]);
}

// ============================================================================
// ACTIVATION
// ============================================================================

#[test]
fn test_activation_bubbles_innermost_first() {
    let doc = Document::new();
    let menu = element(&doc, doc.root(), "div");
    let item = element(&doc, menu, "button");
    let order = Rc::new(RefCell::new(Vec::new()));

    for (node, label) in [(doc.root(), "root"), (menu, "menu"), (item, "item")] {
        let order = Rc::clone(&order);
        doc.add_activation_listener(node, Rc::new(move |_| order.borrow_mut().push(label)));
    }

    assert_eq!(doc.activate(item), 3);
    assert_eq!(*order.borrow(), vec!["item", "menu", "root"]);
    assert_eq!(doc.activate(menu), 2);
}

#[test]
fn test_listener_may_mutate_document() {
    let doc = Document::new();
    let button = element(&doc, doc.root(), "button");

    let weak = Rc::downgrade(&doc);
    doc.add_activation_listener(
        button,
        Rc::new(move |node| {
            if let Some(doc) = weak.upgrade() {
                doc.set_hidden(node, true).unwrap();
            }
        }),
    );

    doc.activate(button);
    assert!(doc.is_hidden(button));
}
