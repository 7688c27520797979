//! Node filters
//!
//! A closed set of predicates over a single node. Filters never descend:
//! `apply` only looks at the nodes of the collection it is given.

use graft_dom::{DomTree, NodeId};

/// Node predicate
///
/// `Filter` deliberately has no `PartialEq`: [`Filter::equals`] is not
/// symmetric for [`Filter::Any`].
#[derive(Debug, Clone)]
pub enum Filter {
    /// Element with this tag
    Tag(String),
    /// Element with this tag and `id`
    Id { tag: String, id: String },
    /// Element with this tag carrying the attribute, optionally with an exact value
    Attribute { tag: String, name: String, value: Option<String> },
    /// Element with this tag whose text content contains the substring
    Text { tag: String, substring: String },
    /// `path` element whose `d` attribute is exactly this vector path.
    /// Icons have no better identity than their shape.
    PathShape(String),
    /// Logical OR
    Any(Vec<Filter>),
}

impl Filter {
    pub fn tag(tag: &str) -> Self {
        Self::Tag(tag.to_ascii_lowercase())
    }

    pub fn id(tag: &str, id: &str) -> Self {
        Self::Id { tag: tag.to_ascii_lowercase(), id: id.to_string() }
    }

    pub fn attribute(tag: &str, name: &str, value: Option<&str>) -> Self {
        Self::Attribute {
            tag: tag.to_ascii_lowercase(),
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    pub fn text(tag: &str, substring: &str) -> Self {
        Self::Text { tag: tag.to_ascii_lowercase(), substring: substring.to_string() }
    }

    pub fn path_shape(d: &str) -> Self {
        Self::PathShape(d.to_string())
    }

    pub fn any(filters: Vec<Filter>) -> Self {
        Self::Any(filters)
    }

    /// Test one node
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(tag) = tree.tag_name(node) else {
            return false;
        };
        match self {
            Self::Tag(want) => tag == want,
            Self::Id { tag: want, id } => tag == want && tree.element_id(node) == Some(id.as_str()),
            Self::Attribute { tag: want, name, value } => {
                tag == want
                    && match (tree.get_attribute(node, name), value) {
                        (Some(actual), Some(value)) => actual == value,
                        (Some(_), None) => true,
                        (None, _) => false,
                    }
            }
            Self::Text { tag: want, substring } => {
                tag == want && tree.text_content(node).contains(substring.as_str())
            }
            Self::PathShape(d) => tag == "path" && tree.get_attribute(node, "d") == Some(d.as_str()),
            Self::Any(filters) => filters.iter().any(|f| f.matches(tree, node)),
        }
    }

    /// Matching nodes of `collection`, in collection order
    pub fn apply(&self, tree: &DomTree, collection: &[NodeId]) -> Vec<NodeId> {
        collection
            .iter()
            .copied()
            .filter(|&node| self.matches(tree, node))
            .collect()
    }

    pub fn apply_single(&self, tree: &DomTree, node: NodeId) -> Option<NodeId> {
        self.matches(tree, node).then_some(node)
    }

    /// Structural equality.
    ///
    /// For `Any` this is "every filter of `other` is in `self`", so
    /// `a.equals(b)` does not imply `b.equals(a)`.
    pub fn equals(&self, other: &Filter) -> bool {
        match (self, other) {
            (Self::Tag(a), Self::Tag(b)) => a == b,
            (Self::Id { tag: ta, id: ia }, Self::Id { tag: tb, id: ib }) => ta == tb && ia == ib,
            (
                Self::Attribute { tag: ta, name: na, value: va },
                Self::Attribute { tag: tb, name: nb, value: vb },
            ) => ta == tb && na == nb && va == vb,
            (
                Self::Text { tag: ta, substring: sa },
                Self::Text { tag: tb, substring: sb },
            ) => ta == tb && sa == sb,
            (Self::PathShape(a), Self::PathShape(b)) => a == b,
            (Self::Any(mine), Self::Any(theirs)) => {
                theirs.iter().all(|t| mine.iter().any(|m| m.equals(t)))
            }
            _ => false,
        }
    }
}
