//! Nodes of the variant tree.
//!
//! Sibling variants of one axis wrap the subtree that was built before
//! their `variants` block, so that subtree is shared: children are
//! reference-counted and never mutated after the splice. The per-node
//! failure cache is the only piece of state touched during enumeration,
//! behind a `RefCell`; clearing it must never change the emitted sequence.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::filters::{FilterExpr, FilterItem};
use crate::label::{Label, LabelSet};
use crate::ops::Operation;

/// Capacity of the per-node most-recently-used failure cache.
pub const NUM_FAILED_CASES: usize = 5;

/// One entry of a node's ordered content: an operation or a filter, with
/// the source position it was parsed at.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEntry {
    pub filename: String,
    pub linenum: i32,
    pub item: ContentItem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Op(Operation),
    Filter(FilterItem),
}

impl fmt::Display for ContentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.item {
            ContentItem::Op(op) => write!(f, "({}:{}: {})", self.filename, self.linenum, op),
            ContentItem::Filter(filter) => {
                write!(f, "({}:{}: {})", self.filename, self.linenum, filter)
            }
        }
    }
}

/// A memoised failed visit: the context it failed in and the filters that
/// caused it, split by origin.
#[derive(Debug, Clone)]
pub struct FailedCase {
    pub ctx: Vec<Label>,
    pub ctx_set: LabelSet,
    pub external_failed: Vec<ContentEntry>,
    pub internal_failed: Vec<ContentEntry>,
}

/// A node of the variant tree.
#[derive(Debug, Default)]
pub struct Node {
    /// Name of the `variants AXIS:` group that introduced this node.
    pub axis_name: Option<String>,
    /// Labels identifying this node within its parent.
    pub name: Vec<Label>,
    /// Source file this node was parsed from (root bookkeeping only).
    pub filename: String,
    /// Dependency hints declared after `- var:`, as a filter expression.
    pub dep: FilterExpr,
    /// Ordered operations and filters attached to this node.
    pub content: Vec<ContentEntry>,
    /// Child alternatives; shared with sibling variants of the same axis.
    pub children: Vec<Rc<Node>>,
    /// All labels reachable in this subtree.
    pub labels: LabelSet,
    /// Whether this node's name contributes to `shortname`.
    pub append_to_shortname: bool,
    /// Whether this node is the declared default of its axis.
    pub is_default: bool,
    /// Bounded most-recently-used cache of failed visits.
    pub failed_cases: RefCell<VecDeque<FailedCase>>,
}

impl Node {
    pub fn new() -> Self {
        Node::default()
    }

    /// Renders the node (and optionally its subtree) for verbose output.
    pub fn dump(&self, indent: usize, recurse: bool) -> String {
        let pad = " ".repeat(indent);
        let names: Vec<String> = self.name.iter().map(Label::to_string).collect();
        let content: Vec<String> = self.content.iter().map(ContentEntry::to_string).collect();
        let mut out = format!("{pad}name: [{}]\n", names.join(", "));
        out.push_str(&format!(
            "{pad}variable name: {}\n",
            self.axis_name.as_deref().unwrap_or("")
        ));
        out.push_str(&format!("{pad}content: [{}]\n", content.join(", ")));
        out.push_str(&format!(
            "{pad}failed cases: {}\n",
            self.failed_cases.borrow().len()
        ));
        if recurse {
            for child in &self.children {
                out.push_str(&child.dump(indent + 3, recurse));
            }
        }
        out
    }
}
