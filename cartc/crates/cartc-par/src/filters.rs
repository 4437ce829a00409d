//! The filter algebra.
//!
//! A filter expression is disjunctive normal form over adjacency sequences
//! of labels: `,` separates disjuncts, `..` separates conjuncts, and `.`
//! chains labels that must appear at consecutive context positions.
//!
//! Five filter kinds share the expression model. `only` and `no` prune
//! variants; `join` multiplies them; conditional blocks gate their inner
//! operations on a positive or negative match. The polarity of the three
//! enumeration predicates pairs `only` with negative conditions and `no`
//! with positive conditions.

use std::fmt;

use crate::label::{Label, LabelSet};
use crate::node::ContentEntry;

/// `.`-chained labels that must match adjacently in the context.
pub type LabelSeq = Vec<Label>;
/// `..`-joined conjunction of sequences.
pub type AndTerm = Vec<LabelSeq>;
/// `,`-joined disjunction of conjunctions.
pub type FilterExpr = Vec<AndTerm>;

/// Counts how many labels of `seq` match adjacently in `ctx`.
///
/// The first label anchors at its first occurrence; subsequent labels must
/// follow at consecutive positions (restarting from the next candidate on
/// mismatch). A sequence whose second label is nowhere in the context
/// matches one element only if its head is the last context element, which
/// keeps partially-entered sequences alive exactly at the subtree boundary.
pub fn match_adjacent(seq: &[Label], ctx: &[Label], ctx_set: &LabelSet) -> usize {
    let Some(first) = seq.first() else {
        return 0;
    };
    if !ctx_set.contains(first) {
        return 0;
    }
    if seq.len() == 1 {
        return 1;
    }
    if !ctx_set.contains(&seq[1]) {
        return usize::from(ctx.last().is_some_and(|last| last.matches(first)));
    }
    let Some(mut i) = ctx.iter().position(|l| l.matches(first)) else {
        return 0;
    };
    let mut k = 0usize;
    while i < ctx.len() {
        if k > 0 && !ctx[i].matches(&seq[k]) {
            i -= k - 1;
            k = 0;
        }
        if ctx[i].matches(&seq[k]) {
            k += 1;
            if k >= seq.len() {
                break;
            }
            if !ctx_set.contains(&seq[k]) {
                break;
            }
        }
        i += 1;
    }
    k
}

/// Whether the unmatched tail of `seq` is still reachable among the
/// descendant labels.
fn might_match_adjacent(
    seq: &[Label],
    ctx: &[Label],
    ctx_set: &LabelSet,
    descendant_labels: &LabelSet,
) -> bool {
    let matched = match_adjacent(seq, ctx, ctx_set);
    seq[matched..]
        .iter()
        .all(|label| descendant_labels.contains(label))
}

/// True when any disjunct has all of its sequences fully matched.
pub fn filter_matches(expr: &FilterExpr, ctx: &[Label], ctx_set: &LabelSet) -> bool {
    expr.iter().any(|and_term| {
        and_term
            .iter()
            .all(|seq| match_adjacent(seq, ctx, ctx_set) == seq.len())
    })
}

/// True when any disjunct could still match somewhere in the subtree.
pub fn filter_might_match(
    expr: &FilterExpr,
    ctx: &[Label],
    ctx_set: &LabelSet,
    descendant_labels: &LabelSet,
) -> bool {
    expr.iter().any(|and_term| {
        and_term
            .iter()
            .all(|seq| might_match_adjacent(seq, ctx, ctx_set, descendant_labels))
    })
}

/// The kind of a filter entry in node content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Only,
    No,
    Join,
    Condition,
    NegativeCondition,
}

/// A filter attached to a node: kind, expression, the source line it was
/// parsed from, and (for conditions) the gated content.
#[derive(Debug, Clone)]
pub struct FilterItem {
    pub kind: FilterKind,
    pub expr: FilterExpr,
    pub line: String,
    pub content: Vec<ContentEntry>,
}

impl FilterItem {
    pub fn new(kind: FilterKind, expr: FilterExpr, line: impl Into<String>) -> Self {
        FilterItem {
            kind,
            expr,
            line: line.into(),
            content: Vec::new(),
        }
    }

    pub fn matches(&self, ctx: &[Label], ctx_set: &LabelSet) -> bool {
        filter_matches(&self.expr, ctx, ctx_set)
    }

    pub fn might_match(
        &self,
        ctx: &[Label],
        ctx_set: &LabelSet,
        descendant_labels: &LabelSet,
    ) -> bool {
        filter_might_match(&self.expr, ctx, ctx_set, descendant_labels)
    }

    /// Whether the enumerator must act on this filter now: for `only` and
    /// negative conditions, the expression can no longer match in this
    /// subtree; for `no` and positive conditions, it already matches.
    pub fn requires_action(
        &self,
        ctx: &[Label],
        ctx_set: &LabelSet,
        descendant_labels: &LabelSet,
    ) -> bool {
        match self.kind {
            FilterKind::Only | FilterKind::NegativeCondition => {
                !self.might_match(ctx, ctx_set, descendant_labels)
            }
            FilterKind::No | FilterKind::Condition => self.matches(ctx, ctx_set),
            FilterKind::Join => false,
        }
    }

    /// Whether this filter can be dropped: it is already decided in this
    /// subtree and acting on it is a no-op.
    pub fn is_irrelevant(
        &self,
        ctx: &[Label],
        ctx_set: &LabelSet,
        descendant_labels: &LabelSet,
    ) -> bool {
        match self.kind {
            FilterKind::Only | FilterKind::NegativeCondition => self.matches(ctx, ctx_set),
            FilterKind::No | FilterKind::Condition => {
                !self.might_match(ctx, ctx_set, descendant_labels)
            }
            FilterKind::Join => false,
        }
    }

    /// Failure-memoisation predicate: given the context a previous visit
    /// failed in, can the current visit fare better? Only when some
    /// sequence has advanced beyond its previously-failed progress is the
    /// situation new.
    pub fn might_pass(
        &self,
        failed_ctx: &[Label],
        failed_ctx_set: &LabelSet,
        ctx: &[Label],
        ctx_set: &LabelSet,
        descendant_labels: &LabelSet,
    ) -> bool {
        match self.kind {
            FilterKind::Only | FilterKind::NegativeCondition => {
                for and_term in &self.expr {
                    for seq in and_term {
                        if match_adjacent(seq, ctx, ctx_set)
                            > match_adjacent(seq, failed_ctx, failed_ctx_set)
                        {
                            return self.might_match(ctx, ctx_set, descendant_labels);
                        }
                    }
                }
                false
            }
            FilterKind::No | FilterKind::Condition => {
                for and_term in &self.expr {
                    for seq in and_term {
                        if match_adjacent(seq, ctx, ctx_set)
                            < match_adjacent(seq, failed_ctx, failed_ctx_set)
                        {
                            return !self.matches(ctx, ctx_set);
                        }
                    }
                }
                false
            }
            FilterKind::Join => true,
        }
    }
}

/// Filters compare by kind and expression; the source line and any gated
/// content are diagnostic payload.
impl PartialEq for FilterItem {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.expr == other.expr
    }
}

/// Renders an expression in its bracketed debug form.
pub fn render_expr(expr: &FilterExpr) -> String {
    let terms: Vec<String> = expr.iter().map(|t| render_and_term(t)).collect();
    format!("[{}]", terms.join(", "))
}

/// Renders a single conjunction in its bracketed debug form.
pub fn render_and_term(term: &AndTerm) -> String {
    let seqs: Vec<String> = term
        .iter()
        .map(|seq| {
            let labels: Vec<String> = seq.iter().map(Label::to_string).collect();
            format!("[{}]", labels.join(", "))
        })
        .collect();
    format!("[{}]", seqs.join(", "))
}

impl fmt::Display for FilterItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FilterKind::Only => write!(f, "Only {}", render_expr(&self.expr)),
            FilterKind::No => write!(f, "No {}", render_expr(&self.expr)),
            FilterKind::Join => write!(f, "Join {}", render_expr(&self.expr)),
            FilterKind::Condition => {
                write!(f, "Condition {}:{} entries", render_expr(&self.expr), self.content.len())
            }
            FilterKind::NegativeCondition => {
                write!(f, "NotCond {}:{} entries", render_expr(&self.expr), self.content.len())
            }
        }
    }
}
