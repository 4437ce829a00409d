//! Dictionary generation from the variant tree.
//!
//! Enumeration is two mutually recursive walks. The joined walk partitions
//! a node's content into `join` filters and the rest: without joins it
//! defers to the plain walk; with joins, every disjunct of every join
//! becomes an independent `only` filter and the node is enumerated once
//! per filter, cross-multiplying the results. The plain walk evaluates
//! filters against the running context, unpacks conditional blocks whose
//! guard is decided, memoises failed visits, and recurses into children.
//!
//! The walks push dictionaries into a sink; only the public entry point
//! flattens suffix-tagged keys, so joined sub-dictionaries keep their tags
//! until the cross product has been merged.

use cartc_util::{
    apply_suffix_bounds, drop_suffixes, DictKey, DictValue, FlatDict, VarDict,
};

use cartc_par::filters::render_and_term;
use cartc_par::label::{join_long_names, join_values, Label, LabelSet};
use cartc_par::node::{ContentEntry, ContentItem, FailedCase, Node, NUM_FAILED_CASES};
use cartc_par::ops::{NAME_MAP_FILE, SHORT_NAME_MAP_FILE};
use cartc_par::{FilterItem, FilterKind, Parser};

use tracing::debug;

/// The deterministic dictionary stream of one enumeration run.
pub struct Dicts {
    inner: std::vec::IntoIter<FlatDict>,
}

impl Iterator for Dicts {
    type Item = FlatDict;

    fn next(&mut self) -> Option<FlatDict> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Dicts {}

/// Enumerates the parser's variant tree. With `skipdups`, suffix-tagged
/// keys whose values all agree collapse back to the bare key.
///
/// The stream may be generated any number of times from the same parser
/// and is identical on every run.
pub fn get_dicts(parser: &Parser, skipdups: bool) -> Dicts {
    let enumerator = Enumerator { parser };
    let mut out = Vec::new();
    enumerator.joined(parser.node(), &[], &[], &[], &[], &mut |d| {
        out.push(drop_suffixes(&d, skipdups));
    });
    Dicts {
        inner: out.into_iter(),
    }
}

/// Method-call convenience over [`get_dicts`].
pub trait GenerateDicts {
    fn get_dicts(&self, skipdups: bool) -> Dicts;
}

impl GenerateDicts for Parser {
    fn get_dicts(&self, skipdups: bool) -> Dicts {
        get_dicts(self, skipdups)
    }
}

/// Merges the names of two joined dictionaries.
///
/// The longest common prefix is trimmed back to the last `.` so the cut
/// never lands inside a label, then the differing tails are concatenated
/// after the shared part (or dot-joined when nothing is shared).
pub fn join_names(n1: &str, n2: &str) -> String {
    let mut mismatch = n1.len().min(n2.len());
    for ((i, c1), (_, c2)) in n1.char_indices().zip(n2.char_indices()) {
        if c1 != c2 {
            mismatch = i;
            break;
        }
    }
    let common = &n1[..mismatch];
    let cp = match common.rfind('.') {
        Some(i) => &common[..i],
        None => "",
    };
    let p1 = &n1[cp.len()..];
    let p2 = &n2[cp.len()..];
    if cp.is_empty() {
        format!("{p1}.{p2}")
    } else {
        format!("{cp}{p1}{p2}")
    }
}

struct Enumerator<'p> {
    parser: &'p Parser,
}

type Sink<'s> = &'s mut dyn FnMut(VarDict);

impl Enumerator<'_> {
    fn debug_enabled(&self) -> bool {
        self.parser.debug_enabled()
    }

    /// Enumerates a node, expanding its `join` filters into a cross
    /// product of `only`-filtered enumerations.
    fn joined(
        &self,
        node: &Node,
        ctx: &[Label],
        content: &[ContentEntry],
        shortname: &[Label],
        dep: &[String],
        sink: Sink<'_>,
    ) {
        let mut non_joins = Vec::new();
        let mut onlys = Vec::new();
        for entry in &node.content {
            match &entry.item {
                ContentItem::Filter(f) if f.kind == FilterKind::Join => {
                    // Each disjunct multiplies independently.
                    for word in &f.expr {
                        let item = FilterItem::new(
                            FilterKind::Only,
                            vec![word.clone()],
                            render_and_term(word),
                        );
                        onlys.push(ContentEntry {
                            filename: entry.filename.clone(),
                            linenum: entry.linenum,
                            item: ContentItem::Filter(item),
                        });
                    }
                }
                _ => non_joins.push(entry.clone()),
            }
        }

        if onlys.is_empty() {
            self.plain(node, &node.content, ctx, content, shortname, dep, sink);
        } else {
            self.join_filters(&onlys, node, &non_joins, ctx, content, shortname, dep, sink);
        }
    }

    /// Enumerates the node once per pending `only` filter, merging each
    /// outer dictionary with every dictionary of the remaining filters.
    /// Later dictionaries overwrite earlier keys.
    #[allow(clippy::too_many_arguments)]
    fn join_filters(
        &self,
        onlys: &[ContentEntry],
        node: &Node,
        base_content: &[ContentEntry],
        ctx: &[Label],
        content: &[ContentEntry],
        shortname: &[Label],
        dep: &[String],
        sink: Sink<'_>,
    ) {
        let (only, remains) = match onlys.split_first() {
            Some((only, remains)) => (only, remains),
            None => return,
        };
        let mut with_only = base_content.to_vec();
        with_only.push(only.clone());

        if remains.is_empty() {
            self.plain(node, &with_only, ctx, content, shortname, dep, sink);
        } else {
            self.plain(node, &with_only, ctx, content, shortname, dep, &mut |d1| {
                self.join_filters(
                    remains,
                    node,
                    base_content,
                    ctx,
                    content,
                    shortname,
                    dep,
                    &mut |d2| {
                        let n1 = dict_str(&d1, "name");
                        let s1 = dict_str(&d1, "shortname");
                        let n2 = dict_str(&d2, "name");
                        let s2 = dict_str(&d2, "shortname");
                        let mut d = d1.clone();
                        for (k, v) in d2 {
                            d.insert(k, v);
                        }
                        d.insert(
                            DictKey::plain("name"),
                            DictValue::Str(join_names(&n1, &n2)),
                        );
                        d.insert(
                            DictKey::plain("shortname"),
                            DictValue::Str(join_names(&s1, &s2)),
                        );
                        sink(d);
                    },
                );
            });
        }
    }

    /// Enumerates a node without join handling: filter evaluation, failure
    /// memoisation, child recursion, and leaf synthesis.
    #[allow(clippy::too_many_arguments)]
    fn plain(
        &self,
        node: &Node,
        node_content: &[ContentEntry],
        ctx: &[Label],
        content: &[ContentEntry],
        shortname: &[Label],
        dep: &[String],
        sink: Sink<'_>,
    ) {
        // Dependency paths render against the context of the parent.
        let mut dep = dep.to_vec();
        for and_term in &node.dep {
            for seq in and_term {
                let mut path: Vec<&str> = ctx.iter().map(Label::long_name).collect();
                path.extend(seq.iter().map(Label::long_name));
                dep.push(path.join("."));
            }
        }

        let mut ctx = ctx.to_vec();
        ctx.extend(node.name.iter().cloned());
        let ctx_set = LabelSet::from_labels(&ctx);
        let labels = &node.labels;
        let name = join_long_names(&ctx);
        if !node.name.is_empty() && self.debug_enabled() {
            debug!("checking out {name:?}");
        }

        // A visit that cannot do better than a memoised failure is pruned;
        // the witness moves to the front of the cache.
        {
            let mut failed_cases = node.failed_cases.borrow_mut();
            let mut hit = None;
            for (i, failed_case) in failed_cases.iter().enumerate() {
                if !self.might_pass(failed_case, node_content, content, &ctx, &ctx_set, labels) {
                    hit = Some(i);
                    break;
                }
            }
            if let Some(i) = hit {
                if self.debug_enabled() {
                    debug!("this subtree has failed before {name:?}");
                }
                if let Some(case) = failed_cases.remove(i) {
                    failed_cases.push_front(case);
                }
                return;
            }
        }

        let mut new_content = Vec::new();
        let mut new_internal = Vec::new();
        let mut new_external = Vec::new();
        let passed = self.process_content(
            node_content,
            &ctx,
            &ctx_set,
            labels,
            &mut new_content,
            &mut new_internal,
            &mut new_external,
            false,
        ) && self.process_content(
            content,
            &ctx,
            &ctx_set,
            labels,
            &mut new_content,
            &mut new_internal,
            &mut new_external,
            true,
        );
        if !passed {
            let mut failed_cases = node.failed_cases.borrow_mut();
            failed_cases.push_front(FailedCase {
                ctx: ctx.clone(),
                ctx_set: ctx_set.clone(),
                external_failed: new_external,
                internal_failed: new_internal,
            });
            if failed_cases.len() > NUM_FAILED_CASES {
                failed_cases.pop_back();
            }
            return;
        }

        let mut shortname = shortname.to_vec();
        if node.append_to_shortname {
            shortname.extend(node.name.iter().cloned());
        }

        // Recurse into children. Under defaults mode the first default
        // child that produced anything ends the axis.
        let axis_not_expanded = match &node.axis_name {
            Some(axis) => !self.parser.expand_defaults().contains(axis),
            None => true,
        };
        let mut count = 0usize;
        for child in &node.children {
            self.joined(child, &ctx, &new_content, &shortname, &dep, &mut |d| {
                count += 1;
                sink(d);
            });
            if self.parser.defaults() && axis_not_expanded && child.is_default && count > 0 {
                break;
            }
        }

        if node.children.is_empty() {
            if self.debug_enabled() {
                debug!("reached leaf, returning it");
            }
            let mut d = VarDict::new();
            d.insert(DictKey::plain("name"), DictValue::Str(name));
            d.insert(DictKey::plain("dep"), DictValue::List(dep));
            d.insert(
                DictKey::plain("shortname"),
                DictValue::Str(join_values(&shortname)),
            );
            d.insert(
                DictKey::plain(NAME_MAP_FILE),
                DictValue::Map(Default::default()),
            );
            d.insert(
                DictKey::plain(SHORT_NAME_MAP_FILE),
                DictValue::Map(Default::default()),
            );
            for entry in &new_content {
                if let ContentItem::Op(op) = &entry.item {
                    op.apply_to_dict(&mut d);
                }
            }
            apply_suffix_bounds(&mut d);
            sink(d);
        }
    }

    /// Splits still-relevant entries into `new_content`, unpacking decided
    /// conditional blocks and dropping decided filters. Returns false as
    /// soon as a pruning filter fires; the culprit lands in the internal
    /// or external failure list depending on where the entry came from.
    #[allow(clippy::too_many_arguments)]
    fn process_content(
        &self,
        entries: &[ContentEntry],
        ctx: &[Label],
        ctx_set: &LabelSet,
        labels: &LabelSet,
        new_content: &mut Vec<ContentEntry>,
        internal: &mut Vec<ContentEntry>,
        external: &mut Vec<ContentEntry>,
        use_external: bool,
    ) -> bool {
        for entry in entries {
            let filter = match &entry.item {
                ContentItem::Op(_) => {
                    new_content.push(entry.clone());
                    continue;
                }
                ContentItem::Filter(filter) => filter,
            };
            if filter.kind == FilterKind::Join {
                new_content.push(entry.clone());
                continue;
            }

            if filter.requires_action(ctx, ctx_set, labels) {
                match filter.kind {
                    FilterKind::Only | FilterKind::No => {
                        if self.debug_enabled() {
                            debug!(
                                "filter did not pass: {:?} ({}:{})",
                                filter.line, entry.filename, entry.linenum
                            );
                        }
                        push_failed(entry, internal, external, use_external);
                        return false;
                    }
                    _ => {
                        if self.debug_enabled() {
                            debug!(
                                "conditional block matches: {:?} ({}:{})",
                                filter.line, entry.filename, entry.linenum
                            );
                        }
                        // Unpack the gated content. Failures inside the
                        // block are internal even when the condition itself
                        // was inherited.
                        if !self.process_content(
                            &filter.content,
                            ctx,
                            ctx_set,
                            labels,
                            new_content,
                            internal,
                            external,
                            false,
                        ) {
                            push_failed(entry, internal, external, use_external);
                            return false;
                        }
                    }
                }
            } else if filter.is_irrelevant(ctx, ctx_set, labels) {
                continue;
            } else {
                new_content.push(entry.clone());
            }
        }
        true
    }

    /// Failure-memoisation check: can the current visit do better than the
    /// recorded failed one?
    fn might_pass(
        &self,
        failed_case: &FailedCase,
        node_content: &[ContentEntry],
        content: &[ContentEntry],
        ctx: &[Label],
        ctx_set: &LabelSet,
        labels: &LabelSet,
    ) -> bool {
        // A recorded filter that is no longer part of the content at all
        // makes the record stale.
        for entry in failed_case
            .external_failed
            .iter()
            .chain(&failed_case.internal_failed)
        {
            if !content.contains(entry) && !node_content.contains(entry) {
                return true;
            }
        }
        for entry in &failed_case.external_failed {
            if let ContentItem::Filter(filter) = &entry.item {
                if !filter.might_pass(&failed_case.ctx, &failed_case.ctx_set, ctx, ctx_set, labels)
                {
                    return false;
                }
            }
        }
        for entry in &failed_case.internal_failed {
            if !node_content.contains(entry) {
                return true;
            }
        }
        for entry in &failed_case.internal_failed {
            if let ContentItem::Filter(filter) = &entry.item {
                if !filter.might_pass(&failed_case.ctx, &failed_case.ctx_set, ctx, ctx_set, labels)
                {
                    return false;
                }
            }
        }
        true
    }
}

fn push_failed(
    entry: &ContentEntry,
    internal: &mut Vec<ContentEntry>,
    external: &mut Vec<ContentEntry>,
    use_external: bool,
) {
    if use_external {
        external.push(entry.clone());
    } else {
        internal.push(entry.clone());
    }
}

fn dict_str(d: &VarDict, key: &str) -> String {
    d.get(&DictKey::plain(key))
        .and_then(DictValue::as_str)
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_names_shared_prefix() {
        assert_eq!(
            join_names("control_group_xy.x", "control_group_xy.y"),
            "control_group_xy.x.y"
        );
    }

    #[test]
    fn test_join_names_no_shared_prefix() {
        assert_eq!(join_names("alpha.one", "beta.two"), "alpha.one.beta.two");
    }

    #[test]
    fn test_join_names_identical() {
        assert_eq!(join_names("j.a", "j.a"), "j.a.a");
    }

    #[test]
    fn test_join_names_trims_to_label_boundary() {
        // The common character prefix reaches into "xz"/"xy" but the cut
        // backs off to the last full label.
        assert_eq!(join_names("g.xz", "g.xy"), "g.xz.xy");
    }
}
