//! cartc-lex - Lexical Analyzer
//!
//! Transforms Cartesian configuration source into a token stream. The
//! source is consumed through a line reader that pre-computes indentation
//! and strips comments; the lexer frames every logical line between an
//! `Indent` token and an `EndL` token and signals the end of an indented
//! block with `EndBlock`.
//!
//! The lexer runs in one of two modes. In fast mode (the default inside
//! ordinary blocks) a line containing an `=`-family operator before any `:`
//! is split directly into identifier, operator, and verbatim right-hand
//! side, which lets assignment values carry arbitrary raw text. In strict
//! mode (used for `variants` headers) the line is scanned character by
//! character into identifiers, operators, whitespace, brackets, and quoted
//! strings.

pub mod lexer;
pub mod reader;
pub mod token;

pub use lexer::Lexer;
pub use reader::{LineReader, STRING_SOURCE};
pub use token::{Token, TokenKind};
