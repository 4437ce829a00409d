//! Suffix reconciliation and suffix-bounded post-processing of variant
//! dictionaries.

use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::dict::{DictKey, DictValue, FlatDict, VarDict};
use crate::size::compare_size;

/// Flattens suffix-tagged keys into textual keys.
///
/// With `skipdups`, a tagged key whose value agrees with every other key of
/// the same base collapses back to the bare base name; a tagged key whose
/// value equals an existing plain key of the same base is dropped outright.
/// Otherwise the key is renamed to the base followed by the suffix chain in
/// reverse order of application.
///
/// Plain keys keep their positions; renamed keys move to the end in the
/// order they were visited. The visit order over the input dictionary fixes
/// the output order, so flattening is deterministic.
pub fn drop_suffixes(d: &VarDict, skipdups: bool) -> FlatDict {
    let mut flat: IndexMap<DictKey, DictValue> = d.clone();

    for (key, value) in d {
        if key.is_reserved() || key.is_plain() {
            continue;
        }

        let mut can_drop_all_suffixes = false;
        if skipdups {
            // A tagged key matching the plain key of the same base carries
            // no extra information.
            let plain = DictKey::plain(&key.base);
            if d.get(&plain).is_some_and(|v| v == value) {
                flat.shift_remove(key);
                continue;
            }

            can_drop_all_suffixes = d
                .iter()
                .filter(|(k, _)| k.base == key.base)
                .all(|(_, v)| v == value);
        }

        let new_key = if skipdups && can_drop_all_suffixes {
            DictKey::plain(&key.base)
        } else {
            let mut text = key.base.clone();
            for suffix in key.suffixes.iter().rev() {
                text.push_str(suffix);
            }
            DictKey::plain(text)
        };

        if let Some(value) = flat.shift_remove(key) {
            flat.insert(new_key, value);
        }
    }

    flat.into_iter().map(|(k, v)| (k.text(), v)).collect()
}

/// Clamps `k` against its `k_max`/`k_min` bounds and pins it to `k_fixed`.
///
/// A bound key also seeds `k` when `k` itself is absent. Keys whose values
/// do not parse as sizes are left untouched.
pub fn apply_suffix_bounds(d: &mut VarDict) {
    let mut pending: IndexMap<String, DictValue> = IndexMap::new();

    for (key, value) in d.iter() {
        if !key.is_plain() {
            continue;
        }
        let bound = value;
        if let Some(pos) = key.base.find("_max").filter(|_| key.base.ends_with("_max")) {
            let target = &key.base[..pos];
            if out_of_bound(d, target, bound, Ordering::Greater) {
                pending.insert(target.to_owned(), bound.clone());
            }
        } else if let Some(pos) = key.base.find("_min").filter(|_| key.base.ends_with("_min")) {
            let target = &key.base[..pos];
            if out_of_bound(d, target, bound, Ordering::Less) {
                pending.insert(target.to_owned(), bound.clone());
            }
        } else if let Some(pos) = key.base.find("_fixed").filter(|_| key.base.ends_with("_fixed"))
        {
            let target = &key.base[..pos];
            pending.insert(target.to_owned(), bound.clone());
        }
    }

    for (key, value) in pending {
        d.insert(DictKey::plain(key), value);
    }
}

fn out_of_bound(d: &VarDict, target: &str, bound: &DictValue, beyond: Ordering) -> bool {
    let Some(current) = d.get(&DictKey::plain(target)) else {
        return true;
    };
    match (current.as_str(), bound.as_str()) {
        (Some(current), Some(bound)) => compare_size(current, bound) == Some(beyond),
        _ => false,
    }
}
