//! Variant labels and label sets.
//!
//! A label is the unit of variant naming and filter matching: a bare value
//! (`qcow2`) or an axis-qualified pair rendered `(axis=value)`. Matching is
//! deliberately asymmetric: a bare query label matches any context label
//! carrying the same value, while an axis-qualified query only matches the
//! full spelling. Label sets index both spellings so either kind of query
//! is a single hash lookup.

use std::fmt;

use rustc_hash::FxHashSet;

/// A variant label: a value, optionally qualified by the axis that
/// introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    value: String,
    axis: Option<String>,
    long_name: String,
}

impl Label {
    /// A bare label.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let long_name = value.clone();
        Label {
            value,
            axis: None,
            long_name,
        }
    }

    /// An axis-qualified label, rendered `(axis=value)`.
    pub fn with_axis(axis: impl Into<String>, value: impl Into<String>) -> Self {
        let axis = axis.into();
        let value = value.into();
        let long_name = format!("({axis}={value})");
        Label {
            value,
            axis: Some(axis),
            long_name,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn axis(&self) -> Option<&str> {
        self.axis.as_deref()
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    /// The spelling this label is looked up by when used as a query.
    pub fn key(&self) -> &str {
        if self.axis.is_some() {
            &self.long_name
        } else {
            &self.value
        }
    }

    /// Whether this context label satisfies `query`.
    ///
    /// Bare queries compare values; axis-qualified queries compare the full
    /// spelling.
    pub fn matches(&self, query: &Label) -> bool {
        if query.axis.is_some() {
            self.long_name == query.long_name
        } else {
            self.value == query.value
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.long_name)
    }
}

/// Joins labels into a dotted path using their full spellings.
pub fn join_long_names(labels: &[Label]) -> String {
    labels
        .iter()
        .map(Label::long_name)
        .collect::<Vec<_>>()
        .join(".")
}

/// Joins labels into a dotted path using bare values only.
pub fn join_values(labels: &[Label]) -> String {
    labels
        .iter()
        .map(Label::value)
        .collect::<Vec<_>>()
        .join(".")
}

/// A set of labels supporting the asymmetric query semantics in O(1).
///
/// Both the bare value and, for axis-qualified labels, the full spelling
/// are indexed, so membership of a query label is one lookup on its
/// [`Label::key`].
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    keys: FxHashSet<String>,
}

impl LabelSet {
    pub fn new() -> Self {
        LabelSet::default()
    }

    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a Label>) -> Self {
        let mut set = LabelSet::new();
        for label in labels {
            set.insert(label);
        }
        set
    }

    pub fn insert(&mut self, label: &Label) {
        self.keys.insert(label.value.clone());
        if label.axis.is_some() {
            self.keys.insert(label.long_name.clone());
        }
    }

    pub fn contains(&self, query: &Label) -> bool {
        self.keys.contains(query.key())
    }

    pub fn merge(&mut self, other: &LabelSet) {
        self.keys.extend(other.keys.iter().cloned());
    }
}
