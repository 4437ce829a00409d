//! cartc-gen - Variant Enumerator
//!
//! Walks a parsed variant tree and streams the resulting parameter
//! dictionaries in a fixed, deterministic order. Filters prune branches as
//! early as possible, previously failed subtree visits are memoised per
//! node, `join` filters multiply matching sub-variants as a cross product,
//! and each emitted dictionary gets variable substitution, suffix
//! reconciliation, and suffix-bounded post-processing applied.

pub mod generate;

pub use generate::{get_dicts, join_names, Dicts, GenerateDicts};
