//! Error types surfaced through the cartc public API.
//!
//! Every syntactic error carries the offending source line and its position
//! so the driver can point at the exact configuration line.

use thiserror::Error;

/// Result alias used across the pipeline crates.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Error raised while lexing, parsing, or resolving a configuration.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Syntactic error detected by the parser.
    #[error("{}", render(.msg, .line, .filename, .linenum))]
    Syntax {
        msg: String,
        line: Option<String>,
        filename: String,
        linenum: i32,
    },

    /// Lexical error: unexpected character or malformed operator sequence.
    #[error("{}", render(.msg, .line, .filename, .linenum))]
    Lexer {
        msg: String,
        line: Option<String>,
        filename: String,
        linenum: i32,
    },

    /// An `include` target that does not exist or is not a regular file.
    #[error("'{line}' ({filename}:{linenum}): file does not exist or it's not a regular file")]
    MissingInclude {
        line: String,
        filename: String,
        linenum: i32,
    },

    /// I/O failure while reading a configuration file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Syntactic error with full source position.
    pub fn syntax(
        msg: impl Into<String>,
        line: Option<&str>,
        filename: &str,
        linenum: i32,
    ) -> Self {
        ParseError::Syntax {
            msg: msg.into(),
            line: line.map(str::to_owned),
            filename: filename.to_owned(),
            linenum,
        }
    }

    /// Syntactic error with no source position attached.
    pub fn bare(msg: impl Into<String>) -> Self {
        ParseError::Syntax {
            msg: msg.into(),
            line: None,
            filename: String::new(),
            linenum: 0,
        }
    }

    /// Lexical error with full source position.
    pub fn lexer(
        msg: impl Into<String>,
        line: Option<&str>,
        filename: &str,
        linenum: i32,
    ) -> Self {
        ParseError::Lexer {
            msg: msg.into(),
            line: line.map(str::to_owned),
            filename: filename.to_owned(),
            linenum,
        }
    }

    /// True for the lexical subset of errors.
    pub fn is_lexer(&self) -> bool {
        matches!(self, ParseError::Lexer { .. })
    }
}

fn render(msg: &str, line: &Option<String>, filename: &str, linenum: &i32) -> String {
    match line {
        Some(line) => format!("{msg}: '{line}' ({filename}:{linenum})"),
        None if filename.is_empty() => msg.to_owned(),
        None => format!("{msg} ({filename}:{linenum})"),
    }
}
