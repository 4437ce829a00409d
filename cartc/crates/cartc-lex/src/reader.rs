//! Line reader over a configuration source.
//!
//! The reader preprocesses the whole source up front: every line is
//! right-trimmed, tabs are expanded to 8-column stops, indentation is
//! measured, and blank lines as well as `#`/`//` comment lines are dropped.
//! What remains is a list of `(stripped_text, indent, linenum)` entries that
//! the lexer pulls block by block.

use std::fs;
use std::io;
use std::path::Path;

/// Sentinel filename used when the source is an in-memory string.
pub const STRING_SOURCE: &str = "<string>";

/// Preprocessed line source with block-scoped access and one-slot pushback.
pub struct LineReader {
    filename: String,
    from_file: bool,
    lines: Vec<(String, i32, i32)>,
    index: usize,
    stored: Option<(String, i32, i32)>,
}

impl LineReader {
    /// Builds a reader over an in-memory string.
    pub fn from_string(source: &str) -> Self {
        LineReader {
            filename: STRING_SOURCE.to_owned(),
            from_file: false,
            lines: preprocess(source),
            index: 0,
            stored: None,
        }
    }

    /// Builds a reader over the contents of a file.
    pub fn open(path: &Path) -> io::Result<Self> {
        let source = fs::read_to_string(path)?;
        Ok(LineReader {
            filename: path.to_string_lossy().into_owned(),
            from_file: true,
            lines: preprocess(&source),
            index: 0,
            stored: None,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// True when the source is a file, which makes relative `include` paths
    /// resolve against its directory.
    pub fn is_file(&self) -> bool {
        self.from_file
    }

    /// Returns the next line of the current block.
    ///
    /// A pushed-back line is returned unconditionally. Otherwise the next
    /// stored line is returned only while its indentation exceeds
    /// `prev_indent`; a shallower line is left in place and
    /// `(None, indent, linenum)` signals the end of the block. At the end
    /// of input the result is `(None, -1, -1)`.
    pub fn next_line(&mut self, prev_indent: i32) -> (Option<String>, i32, i32) {
        if let Some((line, indent, linenum)) = self.stored.take() {
            return (Some(line), indent, linenum);
        }
        match self.lines.get(self.index) {
            None => (None, -1, -1),
            Some((line, indent, linenum)) => {
                if *indent <= prev_indent {
                    return (None, *indent, *linenum);
                }
                self.index += 1;
                (Some(line.clone()), *indent, *linenum)
            }
        }
    }

    /// Makes the next `next_line` call return the given line instead of the
    /// real next line. Empty lines are discarded.
    pub fn push_back(&mut self, line: &str, indent: i32, linenum: i32) {
        let line = line.trim();
        if !line.is_empty() {
            self.stored = Some((line.to_owned(), indent, linenum));
        }
    }

    #[cfg(test)]
    fn raw_lines(&self) -> &[(String, i32, i32)] {
        &self.lines
    }
}

fn preprocess(source: &str) -> Vec<(String, i32, i32)> {
    let mut lines = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let line = expand_tabs(line.trim_end());
        let stripped = line.trim_start();
        if stripped.is_empty() || stripped.starts_with('#') || stripped.starts_with("//") {
            continue;
        }
        let indent = (line.chars().count() - stripped.chars().count()) as i32;
        lines.push((stripped.to_owned(), indent, idx as i32 + 1));
    }
    lines
}

/// Expands tab characters to the next 8-column stop.
fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_owned();
    }
    let mut out = String::with_capacity(line.len());
    let mut col = 0usize;
    for c in line.chars() {
        if c == '\t' {
            let fill = 8 - col % 8;
            out.extend(std::iter::repeat(' ').take(fill));
            col += fill;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization() {
        let reader = LineReader::from_string("line1\nline2\n  line3\n");
        assert_eq!(reader.filename(), "<string>");
        assert!(!reader.is_file());
        assert_eq!(reader.raw_lines().len(), 3);
        assert_eq!(reader.raw_lines()[0], ("line1".to_owned(), 0, 1));
        assert_eq!(reader.raw_lines()[1], ("line2".to_owned(), 0, 2));
        assert_eq!(reader.raw_lines()[2], ("line3".to_owned(), 2, 3));
    }

    #[test]
    fn test_initialization_comments() {
        let reader = LineReader::from_string("line1\nline2\n#line3\n  line4\n//line5\nline6\n");
        assert_eq!(reader.raw_lines().len(), 4);
        assert_eq!(reader.raw_lines()[0], ("line1".to_owned(), 0, 1));
        assert_eq!(reader.raw_lines()[1], ("line2".to_owned(), 0, 2));
        assert_eq!(reader.raw_lines()[2], ("line4".to_owned(), 2, 4));
        assert_eq!(reader.raw_lines()[3], ("line6".to_owned(), 0, 6));
    }

    #[test]
    fn test_initialization_tabs() {
        let reader = LineReader::from_string("line1\nline2  \n\tline3\t\n");
        assert_eq!(reader.raw_lines().len(), 3);
        assert_eq!(reader.raw_lines()[0], ("line1".to_owned(), 0, 1));
        assert_eq!(reader.raw_lines()[1], ("line2".to_owned(), 0, 2));
        assert_eq!(reader.raw_lines()[2], ("line3".to_owned(), 8, 3));
    }

    #[test]
    fn test_get_next_line() {
        let mut reader = LineReader::from_string("line1\nline2\n  line3\n");
        assert_eq!(reader.next_line(-1), (Some("line1".to_owned()), 0, 1));
        assert_eq!(reader.next_line(-1), (Some("line2".to_owned()), 0, 2));
        assert_eq!(reader.next_line(-1), (Some("line3".to_owned()), 2, 3));
        assert_eq!(reader.next_line(-1), (None, -1, -1));
    }

    #[test]
    fn test_block_boundary() {
        let mut reader = LineReader::from_string("  a\n  b\nc\n");
        assert_eq!(reader.next_line(0), (Some("a".to_owned()), 2, 1));
        assert_eq!(reader.next_line(0), (Some("b".to_owned()), 2, 2));
        // "c" is shallower: signalled but not consumed.
        assert_eq!(reader.next_line(0), (None, 0, 3));
        assert_eq!(reader.next_line(-1), (Some("c".to_owned()), 0, 3));
    }

    #[test]
    fn test_set_next_line() {
        let mut reader = LineReader::from_string("line1\nline2\n  line3\n");
        reader.push_back("new line", 1, 4);
        assert_eq!(reader.next_line(-1), (Some("new line".to_owned()), 1, 4));
        assert_eq!(reader.next_line(-1), (Some("line1".to_owned()), 0, 1));
    }

    #[test]
    fn test_set_next_line_ignores_empty() {
        let mut reader = LineReader::from_string("line1\n");
        reader.push_back("   ", 1, 4);
        assert_eq!(reader.next_line(-1), (Some("line1".to_owned()), 0, 1));
    }

    #[test]
    fn test_tab_expansion_columns() {
        assert_eq!(expand_tabs("a\tb"), "a       b");
        assert_eq!(expand_tabs("\tb"), "        b");
        assert_eq!(expand_tabs("abcdefgh\tb"), "abcdefgh        b");
    }
}
