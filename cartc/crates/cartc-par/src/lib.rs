//! cartc-par - Parser (Variant Tree Builder)
//!
//! Builds the variant tree from the token stream: labels and label sets,
//! the operation model applied to variant dictionaries, the filter algebra
//! (`only` / `no` / `join` / conditional blocks), the filter-expression
//! parser, and the recursive-descent block parser driving it all.
//!
//! The tree is append-only once built: sibling variants of one axis share
//! the subtree that preceded their `variants` block, so children hang off
//! reference-counted nodes, and the per-node failure cache uses interior
//! mutability so enumeration can memoise against a shared tree.

pub mod filters;
pub mod label;
pub mod node;
pub mod ops;
pub mod parser;

pub use filters::{
    filter_matches, filter_might_match, match_adjacent, AndTerm, FilterExpr, FilterItem,
    FilterKind, LabelSeq,
};
pub use label::{Label, LabelSet};
pub use node::{ContentEntry, ContentItem, FailedCase, Node, NUM_FAILED_CASES};
pub use ops::{substitute, Operation};
pub use parser::{Parser, ParserConfig};
