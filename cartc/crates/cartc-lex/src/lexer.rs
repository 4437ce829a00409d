//! The indentation-sensitive lexer.
//!
//! Tokens are produced on demand from a [`LineReader`]. The reference
//! behaviour is a resumable scan: the parser may flip lexer state between
//! two token pulls (switching fast/strict mode, or asking for the rest of
//! the current line as one verbatim string), and the change must take
//! effect exactly at the next pull. The lexer therefore keeps a small token
//! queue plus the suspended scan state of the current line, and each refill
//! advances the scan by one emission step.

use std::collections::VecDeque;
use std::sync::OnceLock;

use regex::Regex;

use cartc_util::{ParseError, ParseResult};

use crate::reader::LineReader;
use crate::token::{Token, TokenKind};

/// Matches the first assignment operator of a line in fast mode. `=` wins
/// at any position where a longer spelling does not apply; the alternation
/// is tried left to right at each position.
fn operator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"=|\+=|<=|~=|\?=|\?\+=|\?<=").expect("static operator pattern")
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_oper_char(c: char) -> bool {
    matches!(c, '+' | '<' | '?' | '~')
}

/// Result of advancing the character scan by one step.
enum ScanStep {
    /// Tokens to queue; the scan continues.
    Tokens(Vec<Token>),
    /// Tokens to queue, then the line ends (trailing comment).
    EndLine(Vec<Token>),
    /// Lexical error, message only; position data is added by the lexer.
    Fail(String),
}

/// Scan state of the line currently being tokenised.
struct LineScan {
    text: String,
    chars: Vec<char>,
    /// Index of the next character to examine.
    pos: usize,
    /// Pending identifier characters.
    ident: String,
    /// Pending operator characters awaiting a closing `=`.
    oper: String,
    /// Byte range and token of the fast-mode assignment split, if taken.
    fast_op: Option<(usize, usize, Token)>,
    body_started: bool,
}

impl LineScan {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn rest_from_pos(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    /// One iteration of the strict-mode character scan.
    fn step(&mut self) -> ScanStep {
        let c = self.chars[self.pos];

        if is_ident_char(c) {
            self.ident.push(c);
            self.pos += 1;
            return ScanStep::Tokens(Vec::new());
        }

        if is_oper_char(c) {
            let mut emitted = Vec::new();
            if !self.ident.is_empty() {
                emitted.push(Token::Identifier(std::mem::take(&mut self.ident)));
                self.oper.clear();
            }
            self.oper.push(c);
            self.pos += 1;
            return ScanStep::Tokens(emitted);
        }

        let mut emitted = Vec::new();
        if !self.ident.is_empty() {
            emitted.push(Token::Identifier(std::mem::take(&mut self.ident)));
        }
        let mut cur = c;
        let mut cur_pos = self.pos;
        self.pos += 1;

        if cur.is_whitespace() {
            while !self.at_end() && self.chars[self.pos].is_whitespace() {
                self.pos += 1;
            }
            if self.at_end() {
                // Lines are right-trimmed, so a trailing run only appears on
                // synthetic input; nothing further to emit.
                return ScanStep::Tokens(emitted);
            }
            emitted.push(Token::White);
            cur = self.chars[self.pos];
            cur_pos = self.pos;
            self.pos += 1;
        }

        if is_ident_char(cur) {
            self.ident.push(cur);
        } else if cur == '=' {
            match Token::from_operator(&self.oper) {
                Some(op) => emitted.push(op),
                None => {
                    return ScanStep::Fail(format!("Unexpected character {cur} on pos {cur_pos}"))
                }
            }
            self.oper.clear();
        } else if let Some(token) = Token::from_punctuation(cur) {
            emitted.push(token);
        } else if cur == '"' {
            let mut contents = String::new();
            let mut closed = false;
            while !self.at_end() {
                let sc = self.chars[self.pos];
                self.pos += 1;
                if sc == '"' {
                    closed = true;
                    break;
                }
                contents.push(sc);
            }
            if !closed {
                return ScanStep::Fail(format!("Unterminated string starting on pos {cur_pos}"));
            }
            emitted.push(Token::Str(contents));
        } else if cur == '#' {
            return ScanStep::EndLine(emitted);
        } else if is_oper_char(cur) {
            self.oper.push(cur);
        } else {
            return ScanStep::Fail(format!(
                "Unexpected character {cur} on pos {cur_pos}. Special chars are \
                 allowed only in variable assignation statement"
            ));
        }
        ScanStep::Tokens(emitted)
    }
}

/// Token source over a line reader.
pub struct Lexer {
    reader: LineReader,
    filename: String,
    line: Option<String>,
    linenum: i32,
    prev_indent: i32,
    fast: bool,
    rest_as_string: bool,
    queue: VecDeque<Token>,
    scan: Option<LineScan>,
}

impl Lexer {
    pub fn new(reader: LineReader) -> Self {
        let filename = reader.filename().to_owned();
        Lexer {
            reader,
            filename,
            line: None,
            linenum: 0,
            prev_indent: 0,
            fast: false,
            rest_as_string: false,
            queue: VecDeque::new(),
            scan: None,
        }
    }

    /// Indentation threshold below which the current block ends.
    pub fn set_prev_indent(&mut self, prev_indent: i32) {
        self.prev_indent = prev_indent;
    }

    /// Assignment-biased mode: split at the first `=`-family operator and
    /// take the right-hand side verbatim.
    pub fn set_fast(&mut self) {
        self.fast = true;
    }

    /// Token-by-token mode for `variants` headers.
    pub fn set_strict(&mut self) {
        self.fast = false;
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The text of the line currently being lexed.
    pub fn line(&self) -> Option<&str> {
        self.line.as_deref()
    }

    pub fn linenum(&self) -> i32 {
        self.linenum
    }

    pub fn reader(&self) -> &LineReader {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut LineReader {
        &mut self.reader
    }

    /// Pulls the next token. At the end of input this keeps returning
    /// `EndBlock`, so callers terminate on block structure, not on `None`.
    pub fn next_token(&mut self) -> ParseResult<Token> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Ok(token);
            }
            self.refill()?;
        }
    }

    // ------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------

    fn refill(&mut self) -> ParseResult<()> {
        if self.scan.is_none() {
            self.fetch_line();
        }
        while self.queue.is_empty() && self.scan.is_some() {
            self.step_line()?;
        }
        Ok(())
    }

    /// Fetches the next line, queueing `Indent` plus any leading keyword
    /// tokens, and records the fast-mode assignment split.
    fn fetch_line(&mut self) {
        let (line, indent, linenum) = self.reader.next_line(self.prev_indent);
        self.linenum = linenum;
        let Some(text) = line else {
            self.line = None;
            self.queue.push_back(Token::EndBlock(indent));
            return;
        };
        self.line = Some(text.clone());
        self.queue.push_back(Token::Indent(indent));

        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0usize;
        match chars.first().copied() {
            Some('v') if text.starts_with("variants:") => {
                self.queue.push_back(Token::Variants);
                self.queue.push_back(Token::Colon);
                pos = 9;
            }
            Some('v') if text.starts_with("variants ") => {
                self.queue.push_back(Token::Variants);
                pos = 8;
            }
            Some('-') => {
                self.queue.push_back(Token::Variant);
                pos = 1;
            }
            Some('o') if text.starts_with("only ") => {
                self.queue.push_back(Token::Only);
                pos = skip_spaces(&chars, 4);
            }
            Some('n') if text.starts_with("no ") => {
                self.queue.push_back(Token::No);
                pos = skip_spaces(&chars, 2);
            }
            Some('i') if text.starts_with("include ") => {
                self.queue.push_back(Token::Include);
                pos = 7;
            }
            Some('d') if text.starts_with("del ") => {
                self.queue.push_back(Token::Del);
                pos = skip_spaces(&chars, 3);
            }
            Some('s') if text.starts_with("suffix ") => {
                self.queue.push_back(Token::Suffix);
                pos = skip_spaces(&chars, 6);
            }
            Some('j') if text.starts_with("join ") => {
                self.queue.push_back(Token::Join);
                pos = skip_spaces(&chars, 4);
            }
            _ => {}
        }

        let mut fast_op = None;
        if self.fast && pos == 0 {
            let colon = text.find(':');
            if let Some(m) = operator_pattern().find(&text) {
                if colon.map_or(true, |c| c > m.end()) {
                    let oper = &m.as_str()[..m.as_str().len() - 1];
                    if let Some(op) = Token::from_operator(oper) {
                        fast_op = Some((m.start(), m.end(), op));
                    }
                }
            }
        }

        self.scan = Some(LineScan {
            text,
            chars,
            pos,
            ident: String::new(),
            oper: String::new(),
            fast_op,
            body_started: false,
        });
    }

    /// Advances the scan of the current line by one emission step.
    fn step_line(&mut self) -> ParseResult<()> {
        // The rest-as-string switch is honoured at the exact resume point,
        // wherever the previous pull left the scan.
        if self.rest_as_string {
            self.rest_as_string = false;
            if let Some(scan) = self.scan.take() {
                let rest = scan.rest_from_pos();
                self.queue
                    .push_back(Token::Str(rest.trim_start().to_owned()));
                if !scan.ident.is_empty() {
                    self.queue.push_back(Token::Identifier(scan.ident));
                }
                self.queue.push_back(Token::EndL);
            }
            return Ok(());
        }

        let fast_split = match self.scan.as_mut() {
            Some(scan) if !scan.body_started => {
                scan.body_started = true;
                scan.fast_op.take()
            }
            _ => None,
        };
        if let Some((start, end, op)) = fast_split {
            if let Some(scan) = self.scan.take() {
                self.queue
                    .push_back(Token::Identifier(scan.text[..start].trim_end().to_owned()));
                self.queue.push_back(op);
                self.queue
                    .push_back(Token::Str(scan.text[end..].trim_start().to_owned()));
                self.queue.push_back(Token::EndL);
            }
            return Ok(());
        }

        // Strict-mode character scan: loop until something is queued or the
        // line ends.
        loop {
            let at_end = self.scan.as_ref().map_or(true, LineScan::at_end);
            if at_end {
                if let Some(scan) = self.scan.take() {
                    if !scan.ident.is_empty() {
                        self.queue.push_back(Token::Identifier(scan.ident));
                    }
                }
                self.queue.push_back(Token::EndL);
                return Ok(());
            }

            let step = match self.scan.as_mut() {
                Some(scan) => scan.step(),
                None => return Ok(()),
            };
            match step {
                ScanStep::Tokens(tokens) => {
                    let emitted = !tokens.is_empty();
                    self.queue.extend(tokens);
                    if emitted {
                        return Ok(());
                    }
                }
                ScanStep::EndLine(tokens) => {
                    self.scan = None;
                    self.queue.extend(tokens);
                    self.queue.push_back(Token::EndL);
                    return Ok(());
                }
                ScanStep::Fail(msg) => {
                    return Err(self.lexer_error(msg));
                }
            }
        }
    }

    fn lexer_error(&self, msg: String) -> ParseError {
        ParseError::lexer(msg, self.line.as_deref(), &self.filename, self.linenum)
    }

    // ------------------------------------------------------------------
    // Checked pulls
    // ------------------------------------------------------------------

    fn expected_error(&self, allowed: &[TokenKind], got: &Token) -> ParseError {
        ParseError::syntax(
            format!("Expected {} got '{got}'", render_kinds(allowed)),
            self.line.as_deref(),
            &self.filename,
            self.linenum,
        )
    }

    /// Pulls the next token, requiring it to be one of `allowed`.
    pub fn get_next_check(&mut self, allowed: &[TokenKind]) -> ParseResult<Token> {
        let token = self.next_token()?;
        if allowed.contains(&token.kind()) {
            Ok(token)
        } else {
            Err(self.expected_error(allowed, &token))
        }
    }

    /// Like `get_next_check`, skipping whitespace tokens first.
    pub fn get_next_check_no_white(&mut self, allowed: &[TokenKind]) -> ParseResult<Token> {
        let mut token = self.next_token()?;
        while token.is(TokenKind::White) {
            token = self.next_token()?;
        }
        if allowed.contains(&token.kind()) {
            Ok(token)
        } else {
            Err(self.expected_error(allowed, &token))
        }
    }

    /// Validates an already-pulled token against `allowed`.
    pub fn check_token(&self, token: Token, allowed: &[TokenKind]) -> ParseResult<Token> {
        if allowed.contains(&token.kind()) {
            Ok(token)
        } else {
            Err(self.expected_error(allowed, &token))
        }
    }

    /// Collects tokens up to and including the first terminator.
    pub fn get_until(&mut self, end: &[TokenKind]) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_end = end.contains(&token.kind());
            tokens.push(token);
            if is_end {
                return Ok(tokens);
            }
        }
    }

    /// Collects tokens up to a terminator, requiring every token to be
    /// either allowed or a terminator.
    pub fn get_until_check(
        &mut self,
        allowed: &[TokenKind],
        end: &[TokenKind],
    ) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_end = end.contains(&token.kind());
            if !is_end && !allowed.contains(&token.kind()) {
                let mut all: Vec<TokenKind> = allowed.to_vec();
                all.extend_from_slice(end);
                return Err(self.expected_error(&all, &token));
            }
            tokens.push(token);
            if is_end {
                return Ok(tokens);
            }
        }
    }

    /// Collects tokens up to and including a terminator, dropping
    /// whitespace tokens.
    pub fn get_until_no_white(&mut self, end: &[TokenKind]) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token.is(TokenKind::White) {
                continue;
            }
            let is_end = end.contains(&token.kind());
            tokens.push(token);
            if is_end {
                return Ok(tokens);
            }
        }
    }

    /// The remaining tokens of the current line, excluding the `EndL`.
    pub fn rest_line(&mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token.is(TokenKind::EndL) {
                return Ok(tokens);
            }
            tokens.push(token);
        }
    }

    /// Switches the scan so the remainder of the current line arrives as a
    /// single verbatim string, and returns it.
    pub fn rest_line_as_string(&mut self) -> ParseResult<String> {
        self.rest_as_string = true;
        let token = self.next_token()?;
        let Token::Str(s) = token else {
            return Err(ParseError::bare(format!("Expected string, got '{token}'")));
        };
        let end = self.next_token()?;
        if !end.is(TokenKind::EndL) {
            return Err(ParseError::bare(format!(
                "Expected end-of-line, got '{end}'"
            )));
        }
        Ok(s)
    }
}

fn skip_spaces(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

fn render_kinds(kinds: &[TokenKind]) -> String {
    let rendered: Vec<String> = kinds.iter().map(|k| format!("'{k}'")).collect();
    format!("[{}]", rendered.join(", "))
}
