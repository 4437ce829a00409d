//! The variant dictionary model.
//!
//! A variant dictionary maps keys to string-like values in insertion order.
//! Keys are plain until a `suffix` operation tags them, at which point the
//! key becomes a base plus an ordered suffix chain. The chain is kept
//! structured so later passes can merge or drop suffixes; the textual form
//! (base followed by the concatenated suffixes) is what regex-family
//! operators match against.

use std::fmt;

use indexmap::IndexMap;

/// Keys that the configuration language may never assign, delete, or
/// suffix-tag. They are owned by the enumerator.
pub const RESERVED_KEYS: [&str; 5] = [
    "name",
    "shortname",
    "dep",
    "_name_map_file",
    "_short_name_map_file",
];

/// Returns true if `key` is one of the reserved output keys.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// A dictionary key: a base name plus the chain of suffix tags applied to
/// it, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DictKey {
    pub base: String,
    pub suffixes: Vec<String>,
}

impl DictKey {
    /// A plain, untagged key.
    pub fn plain(base: impl Into<String>) -> Self {
        DictKey {
            base: base.into(),
            suffixes: Vec::new(),
        }
    }

    /// Returns true if no suffix tag has been applied.
    pub fn is_plain(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// Reserved keys are always plain; a tagged key is never reserved.
    pub fn is_reserved(&self) -> bool {
        self.is_plain() && is_reserved(&self.base)
    }

    /// The key with one more suffix tag appended.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let mut suffixes = self.suffixes.clone();
        suffixes.push(suffix.to_owned());
        DictKey {
            base: self.base.clone(),
            suffixes,
        }
    }

    /// Textual form: base followed by the suffixes, no separator.
    pub fn text(&self) -> String {
        let mut s = self.base.clone();
        for suffix in &self.suffixes {
            s.push_str(suffix);
        }
        s
    }
}

impl fmt::Display for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for DictKey {
    fn from(base: &str) -> Self {
        DictKey::plain(base)
    }
}

/// A dictionary value. User keys always hold strings; the reserved keys
/// `dep` and the two file maps hold a list and maps respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictValue {
    Str(String),
    List(Vec<String>),
    Map(IndexMap<String, String>),
}

impl DictValue {
    pub fn str(value: impl Into<String>) -> Self {
        DictValue::Str(value.into())
    }

    /// The string payload, if this is a plain string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DictValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DictValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictValue::Str(s) => f.write_str(s),
            DictValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{item}'")?;
                }
                write!(f, "]")
            }
            DictValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{k}': '{v}'")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A variant dictionary while operations are still being applied: keys may
/// carry suffix chains.
pub type VarDict = IndexMap<DictKey, DictValue>;

/// A final, suffix-flattened dictionary with purely textual keys.
pub type FlatDict = IndexMap<String, DictValue>;
