//! The operation model: everything a configuration line can do to a
//! variant dictionary, applied in order at enumeration time.
//!
//! Assignment values go through `${name}` substitution against a
//! suffix-flattened view of the dictionary at application time. The
//! regex-family operators and `del` match keys against an anchored pattern
//! compiled once per distinct key spelling.

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::FxHashMap;

use cartc_util::{drop_suffixes, is_reserved, DictKey, DictValue, VarDict};

use cartc_lex::{TokenKind, STRING_SOURCE};

/// Destination keys for [`Operation::UpdateFileMap`].
pub const NAME_MAP_FILE: &str = "_name_map_file";
pub const SHORT_NAME_MAP_FILE: &str = "_short_name_map_file";

/// A dictionary-mutating operation attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `k = v`
    Set { key: String, value: String },
    /// `k += v`
    Append { key: String, value: String },
    /// `k <= v`
    Prepend { key: String, value: String },
    /// `k ~= v` — set only when the key is absent.
    LazySet { key: String, value: String },
    /// `k ?= v` — set every key matching the anchored regex.
    RegexSet { key: String, value: String },
    /// `k ?+= v`
    RegexAppend { key: String, value: String },
    /// `k ?<= v`
    RegexPrepend { key: String, value: String },
    /// `del k` — remove every key matching the anchored regex.
    Del { key: String },
    /// Batched `$`-free assignments merged in one shot.
    ApplyPreDict { dict: VarDict },
    /// Records the variant path of a source file under one of the two
    /// file-map keys.
    UpdateFileMap {
        file: String,
        name: String,
        dest: &'static str,
    },
    /// `suffix S` — tags every non-reserved key with the suffix.
    Suffix { value: String },
}

impl Operation {
    /// Builds the operation for an assignment operator token.
    pub fn from_operator(kind: TokenKind, key: String, value: String) -> Option<Operation> {
        match kind {
            TokenKind::Set => Some(Operation::Set { key, value }),
            TokenKind::Append => Some(Operation::Append { key, value }),
            TokenKind::Prepend => Some(Operation::Prepend { key, value }),
            TokenKind::LazySet => Some(Operation::LazySet { key, value }),
            TokenKind::RegexSet => Some(Operation::RegexSet { key, value }),
            TokenKind::RegexAppend => Some(Operation::RegexAppend { key, value }),
            TokenKind::RegexPrepend => Some(Operation::RegexPrepend { key, value }),
            _ => None,
        }
    }

    /// Builds a file-map update. File paths collapse to their basename;
    /// the `<string>` sentinel of in-memory sources is preserved verbatim.
    pub fn update_file_map(filename: &str, name: String, dest: &'static str) -> Operation {
        let file = if filename == STRING_SOURCE {
            filename.to_owned()
        } else {
            Path::new(filename)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| filename.to_owned())
        };
        Operation::UpdateFileMap { file, name, dest }
    }

    /// The assignment target, for operations that have a single one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Operation::Set { key, .. }
            | Operation::Append { key, .. }
            | Operation::Prepend { key, .. }
            | Operation::LazySet { key, .. }
            | Operation::RegexSet { key, .. }
            | Operation::RegexAppend { key, .. }
            | Operation::RegexPrepend { key, .. }
            | Operation::Del { key } => Some(key),
            _ => None,
        }
    }

    /// Applies the operation to a dictionary in place. Reserved keys are
    /// never assigned, renamed, or deleted.
    pub fn apply_to_dict(&self, d: &mut VarDict) {
        match self {
            Operation::Set { key, value } => {
                if !is_reserved(key) {
                    let value = substitute(value, d);
                    d.insert(DictKey::plain(key), DictValue::Str(value));
                }
            }
            Operation::Append { key, value } => {
                if !is_reserved(key) {
                    let value = substitute(value, d);
                    let prev = plain_str(d, key).unwrap_or_default();
                    d.insert(DictKey::plain(key), DictValue::Str(prev + &value));
                }
            }
            Operation::Prepend { key, value } => {
                if !is_reserved(key) {
                    let value = substitute(value, d);
                    let prev = plain_str(d, key).unwrap_or_default();
                    d.insert(DictKey::plain(key), DictValue::Str(value + &prev));
                }
            }
            Operation::LazySet { key, value } => {
                if !is_reserved(key) && !d.contains_key(&DictKey::plain(key)) {
                    let value = substitute(value, d);
                    d.insert(DictKey::plain(key), DictValue::Str(value));
                }
            }
            Operation::RegexSet { key, value } => {
                let value = substitute(value, d);
                if let Some(re) = cached_regex(key) {
                    for (k, v) in d.iter_mut() {
                        if !k.is_reserved() && re.is_match(&k.text()) {
                            *v = DictValue::Str(value.clone());
                        }
                    }
                }
            }
            Operation::RegexAppend { key, value } => {
                let value = substitute(value, d);
                if let Some(re) = cached_regex(key) {
                    for (k, v) in d.iter_mut() {
                        if !k.is_reserved() && re.is_match(&k.text()) {
                            if let DictValue::Str(s) = v {
                                s.push_str(&value);
                            }
                        }
                    }
                }
            }
            Operation::RegexPrepend { key, value } => {
                let value = substitute(value, d);
                if let Some(re) = cached_regex(key) {
                    for (k, v) in d.iter_mut() {
                        if !k.is_reserved() && re.is_match(&k.text()) {
                            if let DictValue::Str(s) = v {
                                *s = format!("{value}{s}");
                            }
                        }
                    }
                }
            }
            Operation::Del { key } => {
                if let Some(re) = cached_regex(key) {
                    let doomed: Vec<DictKey> = d
                        .keys()
                        .filter(|k| !k.is_reserved() && re.is_match(&k.text()))
                        .cloned()
                        .collect();
                    for k in doomed {
                        d.shift_remove(&k);
                    }
                }
            }
            Operation::ApplyPreDict { dict } => {
                for (k, v) in dict {
                    d.insert(k.clone(), v.clone());
                }
            }
            Operation::UpdateFileMap { file, name, dest } => {
                let entry = d
                    .entry(DictKey::plain(*dest))
                    .or_insert_with(|| DictValue::Map(IndexMap::new()));
                if let DictValue::Map(map) = entry {
                    let merged = match map.get(file) {
                        Some(old) => format!("{name}.{old}"),
                        None => name.clone(),
                    };
                    map.insert(file.clone(), merged);
                }
            }
            Operation::Suffix { value } => {
                let keys: Vec<DictKey> = d.keys().cloned().collect();
                for key in keys {
                    if key.is_reserved() {
                        continue;
                    }
                    if let Some(v) = d.shift_remove(&key) {
                        d.insert(key.with_suffix(value), v);
                    }
                }
            }
        }
    }
}

fn plain_str(d: &VarDict, key: &str) -> Option<String> {
    d.get(&DictKey::plain(key))
        .and_then(DictValue::as_str)
        .map(str::to_owned)
}

/// Compiled `^(?:KEY)$` patterns, cached per key spelling. An unparsable
/// pattern matches nothing.
fn cached_regex(name: &str) -> Option<Regex> {
    static CACHE: OnceLock<Mutex<FxHashMap<String, Option<Regex>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(FxHashMap::default()));
    let mut cache = cache.lock().ok()?;
    cache
        .entry(name.to_owned())
        .or_insert_with(|| Regex::new(&format!("^(?:{name})$")).ok())
        .clone()
}

fn substitution_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{(.+?)\}").expect("static substitution pattern"))
}

/// Substitutes `${name}` occurrences in `value` against a suffix-flattened
/// view of `d`.
///
/// The flattened view is built once per value, so a key set under a suffix
/// tag resolves by its bare name as long as no sibling disagrees. An
/// unknown name aborts the remaining substitutions and the tail of the
/// value is copied verbatim; a literal `${}` never matches.
pub fn substitute(value: &str, d: &VarDict) -> String {
    if !value.contains('$') {
        return value.to_owned();
    }
    let flat = drop_suffixes(d, true);
    let re = substitution_pattern();
    let mut out = String::new();
    let mut start = 0usize;
    while let Some(caps) = re.captures_at(value, start) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let Some(found) = flat.get(name.as_str()) else {
            break;
        };
        out.push_str(&value[start..whole.start()]);
        out.push_str(&found.to_string());
        start = whole.end();
    }
    out.push_str(&value[start..]);
    out
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Set { key, value } => write!(f, "{key} = {value}"),
            Operation::Append { key, value } => write!(f, "{key} += {value}"),
            Operation::Prepend { key, value } => write!(f, "{key} <= {value}"),
            Operation::LazySet { key, value } => write!(f, "{key} ~= {value}"),
            Operation::RegexSet { key, value } => write!(f, "{key} ?= {value}"),
            Operation::RegexAppend { key, value } => write!(f, "{key} ?+= {value}"),
            Operation::RegexPrepend { key, value } => write!(f, "{key} ?<= {value}"),
            Operation::Del { key } => write!(f, "del {key}"),
            Operation::ApplyPreDict { dict } => {
                write!(f, "apply_pre_dict: {{")?;
                for (i, (k, v)) in dict.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Operation::UpdateFileMap { file, name, dest } => {
                write!(f, "update_file_map {dest} {file} -> {name}")
            }
            Operation::Suffix { value } => write!(f, "suffix {value}"),
        }
    }
}
