//! Recursive-descent parser building the variant tree.
//!
//! Parsing is indentation-driven: each block is a run of statements at one
//! indentation level, closed by the first shallower line. `variants`
//! blocks splice the tree — every variant alternative wraps the subtree
//! built so far, so later statements multiply against earlier ones.
//!
//! Plain `$`-free assignments are batched into a scratch dictionary and
//! flushed as a single merge operation; the batch must be flushed (or
//! folded into) whenever a later operation could observe one of its keys.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use cartc_lex::{Lexer, LineReader, Token, TokenKind, STRING_SOURCE};
use cartc_util::{DictKey, ParseError, ParseResult, VarDict};

use crate::filters::{FilterExpr, FilterItem, FilterKind};
use crate::label::{join_long_names, join_values, Label};
use crate::node::{ContentEntry, ContentItem, Node};
use crate::ops::{Operation, NAME_MAP_FILE, SHORT_NAME_MAP_FILE};

const INDENT_ALLOWED: &[TokenKind] = &[TokenKind::Indent, TokenKind::EndBlock];

const BLOCK_ALLOWED: &[TokenKind] = &[
    TokenKind::Variants,
    TokenKind::Identifier,
    TokenKind::Only,
    TokenKind::No,
    TokenKind::Include,
    TokenKind::Del,
    TokenKind::NotCond,
    TokenKind::Suffix,
    TokenKind::Join,
];

const VARIANTS_ALLOWED: &[TokenKind] = &[TokenKind::Variant];

const IDENTIFIER_ALLOWED: &[TokenKind] = &[
    TokenKind::Set,
    TokenKind::Append,
    TokenKind::Prepend,
    TokenKind::LazySet,
    TokenKind::RegexSet,
    TokenKind::RegexAppend,
    TokenKind::RegexPrepend,
    TokenKind::Colon,
    TokenKind::EndL,
];

const VARIANTS_HEADER_ALLOWED: &[TokenKind] = &[
    TokenKind::LBracket,
    TokenKind::Colon,
    TokenKind::Identifier,
    TokenKind::EndL,
];

/// A `[meta]` or `[meta=tokens]` entry of a `variants` header.
#[derive(Debug, Clone, PartialEq)]
enum MetaValue {
    Flag,
    Tokens(Vec<String>),
}

type Meta = IndexMap<String, Vec<MetaValue>>;

/// Parser options.
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Emit only the default variant of each axis.
    pub defaults: bool,
    /// Axes whose variants are expanded even under `defaults`.
    pub expand_defaults: Vec<String>,
    /// Emit debug-level diagnostics while parsing and enumerating.
    pub debug: bool,
}

/// The configuration parser. Repeated `parse_*` calls extend the same
/// tree, which is how command-line override strings are layered on top of
/// a parsed file.
#[derive(Debug)]
pub struct Parser {
    node: Node,
    defaults: bool,
    expand_defaults: Vec<String>,
    debug: bool,
    filename: Option<PathBuf>,
    only_filters: Vec<String>,
    no_filters: Vec<String>,
    assignments: Vec<String>,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Parser {
            node: Node::new(),
            defaults: config.defaults,
            expand_defaults: config.expand_defaults,
            debug: config.debug,
            filename: None,
            only_filters: Vec::new(),
            no_filters: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Parses `path` into a fresh parser.
    pub fn from_file(path: impl AsRef<Path>, config: ParserConfig) -> ParseResult<Self> {
        let mut parser = Parser::new(config);
        parser.parse_file(path)?;
        Ok(parser)
    }

    /// Parses a configuration file, extending the current tree. On error
    /// the tree is left indeterminate and must be discarded.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> ParseResult<()> {
        let path = path.as_ref();
        let reader = LineReader::open(path)?;
        let mut lexer = Lexer::new(reader);
        let mut node = std::mem::take(&mut self.node);
        node.filename = path.to_string_lossy().into_owned();
        self.node = self.parse_root(&mut lexer, node)?;
        self.filename = Some(path.to_path_buf());
        Ok(())
    }

    /// Parses a configuration string, extending the current tree.
    pub fn parse_string(&mut self, source: &str) -> ParseResult<()> {
        let reader = LineReader::from_string(source);
        let mut lexer = Lexer::new(reader);
        let mut node = std::mem::take(&mut self.node);
        node.filename = STRING_SOURCE.to_owned();
        self.node = self.parse_root(&mut lexer, node)?;
        Ok(())
    }

    /// Applies an `only` filter programmatically and keeps track of it.
    pub fn only_filter(&mut self, variant: &str) -> ParseResult<()> {
        let line = format!("only {variant}");
        self.only_filters.push(line.clone());
        self.parse_string(&line)
    }

    /// Applies a `no` filter programmatically and keeps track of it.
    pub fn no_filter(&mut self, variant: &str) -> ParseResult<()> {
        let line = format!("no {variant}");
        self.no_filters.push(line.clone());
        self.parse_string(&line)
    }

    /// Applies an assignment programmatically and keeps track of it.
    pub fn assign(&mut self, key: &str, value: &str) -> ParseResult<()> {
        let line = format!("{key} = {value}");
        self.assignments.push(line.clone());
        self.parse_string(&line)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn defaults(&self) -> bool {
        self.defaults
    }

    pub fn expand_defaults(&self) -> &[String] {
        &self.expand_defaults
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn only_filters(&self) -> &[String] {
        &self.only_filters
    }

    pub fn no_filters(&self) -> &[String] {
        &self.no_filters
    }

    pub fn assignments(&self) -> &[String] {
        &self.assignments
    }

    fn parse_root(&mut self, lexer: &mut Lexer, node: Node) -> ParseResult<Node> {
        match self.parse_block(lexer, node, -1, false) {
            Ok(node) => Ok(node),
            Err(err) => {
                if self.debug {
                    debug!(
                        "{}  {}:  {:?}",
                        lexer.filename(),
                        lexer.linenum(),
                        lexer.line()
                    );
                }
                Err(err)
            }
        }
    }

    /// Parses one indented block into `node`, returning the node that
    /// represents the block afterwards (a `variants` block replaces it
    /// with the node of the last axis).
    fn parse_block(
        &mut self,
        lexer: &mut Lexer,
        mut node: Node,
        prev_indent: i32,
        in_condition: bool,
    ) -> ParseResult<Node> {
        let mut allowed = BLOCK_ALLOWED;
        let mut var_indent = 0;
        let mut var_name: Option<String> = None;
        let mut meta: Meta = Meta::new();
        let mut pre_dict = VarDict::new();
        // A suffix applies to everything in its block, so it is emitted as
        // the block's final entry; a later `suffix` replaces it.
        let mut suffix: Option<ContentEntry> = None;
        lexer.set_fast();

        loop {
            lexer.set_prev_indent(prev_indent);
            let token = lexer.get_next_check(INDENT_ALLOWED)?;
            if token.is(TokenKind::EndBlock) {
                if !pre_dict.is_empty() {
                    flush_pre_dict(lexer, &mut node, &mut pre_dict);
                }
                if let Some(suffix) = suffix.take() {
                    node.content.push(suffix);
                }
                return Ok(node);
            }
            let indent = match token {
                Token::Indent(indent) => indent,
                _ => 0,
            };

            let token = lexer.get_next_check(allowed)?;
            match token.kind() {
                TokenKind::Identifier => {
                    let mut parts = lexer.get_until_no_white(IDENTIFIER_ALLOWED)?;
                    let last = match parts.pop() {
                        Some(last) => last,
                        None => return Err(self.syntax_error(lexer, "Syntax ERROR expected")),
                    };
                    if last.is_operator() {
                        let key = if parts.is_empty() {
                            token.text().unwrap_or_default().to_owned()
                        } else {
                            let mut key = token.text().unwrap_or_default().to_owned();
                            for part in &parts {
                                key.push_str(&part.to_string());
                            }
                            key
                        };
                        let value_token = lexer.get_next_check(&[TokenKind::Str])?;
                        let value = strip_quotes(value_token.text().unwrap_or_default());
                        let substitution_free = !value.contains('$');
                        let op = match Operation::from_operator(last.kind(), key, value) {
                            Some(op) => op,
                            None => return Err(self.syntax_error(lexer, "Syntax ERROR expected")),
                        };

                        if matches!(op, Operation::Set { .. }) && substitution_free {
                            op.apply_to_dict(&mut pre_dict);
                        } else {
                            if !pre_dict.is_empty() {
                                let collides = op
                                    .key()
                                    .is_some_and(|k| pre_dict.contains_key(&DictKey::plain(k)));
                                if collides && substitution_free {
                                    // The batch already holds the target
                                    // key, so the operator folds straight
                                    // into it.
                                    op.apply_to_dict(&mut pre_dict);
                                    lexer.get_next_check(&[TokenKind::EndL])?;
                                    continue;
                                }
                                flush_pre_dict(lexer, &mut node, &mut pre_dict);
                            }
                            node.content.push(entry_at(lexer, ContentItem::Op(op)));
                        }
                        lexer.get_next_check(&[TokenKind::EndL])?;
                    } else if last.is(TokenKind::Colon) {
                        // Conditional block: the path before the colon is a
                        // filter, the rest of the line (if any) is its
                        // first statement.
                        let mut filter_tokens = vec![token];
                        filter_tokens.extend(parts);
                        let cfilter = Self::parse_filter_tokens(lexer, filter_tokens)?;
                        let cond_line = lexer.line().unwrap_or_default().to_owned();
                        let inline = lexer.rest_line_as_string()?;
                        if !inline.is_empty() {
                            let linenum = lexer.linenum();
                            lexer.reader_mut().push_back(&inline, indent + 1, linenum);
                        }
                        let gated = self.parse_block(lexer, Node::new(), indent, true)?;
                        flush_pre_dict(lexer, &mut node, &mut pre_dict);
                        let mut item = FilterItem::new(FilterKind::Condition, cfilter, cond_line);
                        item.content = gated.content;
                        node.content.push(entry_at(lexer, ContentItem::Filter(item)));
                    } else {
                        return Err(
                            self.syntax_error(lexer, "Syntax ERROR expected ':' or operand")
                        );
                    }
                }

                TokenKind::Variant => {
                    if !pre_dict.is_empty() {
                        flush_pre_dict(lexer, &mut node, &mut pre_dict);
                    }
                    node = self.parse_variants_block(
                        lexer, node, indent, var_indent, &var_name, &mut meta,
                    )?;
                    allowed = BLOCK_ALLOWED;
                }

                TokenKind::Variants => {
                    if in_condition {
                        return Err(self.syntax_error(
                            lexer,
                            "'variants' is not allowed inside a conditional block",
                        ));
                    }
                    (var_name, var_indent) = self.parse_variants_header(lexer, indent, &mut meta)?;
                    allowed = VARIANTS_ALLOWED;
                }

                kind @ (TokenKind::Only | TokenKind::No | TokenKind::Join) => {
                    let tokens = lexer.rest_line()?;
                    let expr = Self::parse_filter_tokens(lexer, tokens)?;
                    let line = lexer.line().unwrap_or_default().to_owned();
                    flush_pre_dict(lexer, &mut node, &mut pre_dict);
                    let filter_kind = match kind {
                        TokenKind::Only => FilterKind::Only,
                        TokenKind::No => FilterKind::No,
                        _ => FilterKind::Join,
                    };
                    let item = FilterItem::new(filter_kind, expr, line);
                    node.content.push(entry_at(lexer, ContentItem::Filter(item)));
                }

                TokenKind::Suffix => {
                    if !pre_dict.is_empty() {
                        flush_pre_dict(lexer, &mut node, &mut pre_dict);
                    }
                    let tag = lexer.get_next_check(&[TokenKind::Identifier])?;
                    lexer.get_next_check(&[TokenKind::EndL])?;
                    let op = Operation::Suffix {
                        value: tag.text().unwrap_or_default().to_owned(),
                    };
                    suffix = Some(entry_at(lexer, ContentItem::Op(op)));
                }

                TokenKind::Include => {
                    let target = lexer.rest_line_as_string()?;
                    let mut path = expand_user(&target);
                    if lexer.reader().is_file() && path.is_relative() {
                        if let Some(dir) = Path::new(lexer.filename()).parent() {
                            path = dir.join(path);
                        }
                    }
                    if !path.is_file() {
                        return Err(ParseError::MissingInclude {
                            line: lexer.line().unwrap_or_default().to_owned(),
                            filename: lexer.filename().to_owned(),
                            linenum: lexer.linenum(),
                        });
                    }
                    flush_pre_dict(lexer, &mut node, &mut pre_dict);
                    let mut included = Lexer::new(LineReader::open(&path)?);
                    node = self.parse_block(&mut included, node, -1, in_condition)?;
                    lexer.set_prev_indent(prev_indent);
                }

                TokenKind::Del => {
                    let target =
                        lexer.get_next_check_no_white(&[TokenKind::Str, TokenKind::Identifier])?;
                    lexer.get_next_check_no_white(&[TokenKind::EndL])?;
                    let op = Operation::Del {
                        key: target.text().unwrap_or_default().to_owned(),
                    };
                    flush_pre_dict(lexer, &mut node, &mut pre_dict);
                    node.content.push(entry_at(lexer, ContentItem::Op(op)));
                }

                TokenKind::NotCond => {
                    let mut tokens =
                        lexer.get_until_no_white(&[TokenKind::Colon, TokenKind::EndL])?;
                    tokens.pop();
                    let expr = Self::parse_filter_tokens(lexer, tokens)?;
                    let cond_line = lexer.line().unwrap_or_default().to_owned();
                    let inline = lexer.rest_line_as_string()?;
                    if !inline.is_empty() {
                        let linenum = lexer.linenum();
                        lexer.reader_mut().push_back(&inline, indent + 1, linenum);
                    }
                    let gated = self.parse_block(lexer, Node::new(), indent, true)?;
                    lexer.set_prev_indent(prev_indent);
                    flush_pre_dict(lexer, &mut node, &mut pre_dict);
                    let mut item = FilterItem::new(FilterKind::NegativeCondition, expr, cond_line);
                    item.content = gated.content;
                    node.content.push(entry_at(lexer, ContentItem::Filter(item)));
                }

                _ => return Err(self.syntax_error(lexer, "Syntax ERROR expected")),
            }
        }
    }

    /// Parses a `variants NAME [meta]*:` header. Returns the axis name and
    /// the header's indentation.
    fn parse_variants_header(
        &mut self,
        lexer: &mut Lexer,
        indent: i32,
        meta: &mut Meta,
    ) -> ParseResult<(Option<String>, i32)> {
        lexer.set_strict();
        let tokens = lexer.get_until_no_white(VARIANTS_HEADER_ALLOWED)?;
        let mut current = match tokens.last() {
            Some(token) => token.clone(),
            None => return Err(self.syntax_error(lexer, "Syntax ERROR expected ':'")),
        };
        let mut var_name: Option<String> = None;
        meta.clear();

        while !current.is(TokenKind::Colon) && !current.is(TokenKind::EndL) {
            match current.kind() {
                TokenKind::Identifier => {
                    if var_name.is_some() {
                        return Err(self.syntax_error(lexer, "Syntax ERROR expected '[' or ':'"));
                    }
                    var_name = Some(current.text().unwrap_or_default().to_owned());
                }
                TokenKind::LBracket => {
                    let ident = lexer.get_next_check_no_white(&[TokenKind::Identifier])?;
                    let key = ident.text().unwrap_or_default().to_owned();
                    let next =
                        lexer.get_next_check_no_white(&[TokenKind::Set, TokenKind::RBracket])?;
                    if next.is(TokenKind::RBracket) {
                        meta.entry(key).or_default().push(MetaValue::Flag);
                    } else {
                        let value_tokens = lexer
                            .get_until_no_white(&[TokenKind::RBracket, TokenKind::EndL])?;
                        match value_tokens.last() {
                            Some(last) if last.is(TokenKind::RBracket) => {
                                let values = value_tokens[..value_tokens.len() - 1]
                                    .iter()
                                    .map(Token::to_string)
                                    .collect();
                                meta.entry(key).or_default().push(MetaValue::Tokens(values));
                            }
                            _ => {
                                return Err(self.syntax_error(lexer, "Syntax ERROR expected ']'"))
                            }
                        }
                    }
                }
                _ => {}
            }
            current = lexer.get_next_check_no_white(VARIANTS_HEADER_ALLOWED)?;
        }

        if let Some(values) = meta.get("default") {
            if values.iter().any(|v| matches!(v, MetaValue::Flag)) {
                return Err(self.syntax_error(lexer, "Syntax ERROR expected [default=xxx]"));
            }
        }
        if current.is(TokenKind::EndL) {
            return Err(self.syntax_error(lexer, "Syntax ERROR expected ':'"));
        }
        lexer.get_next_check_no_white(&[TokenKind::EndL])?;
        Ok((var_name, indent))
    }

    /// Parses the `- name:` alternatives of a `variants` block. The tree
    /// built so far becomes the shared child of every alternative; the
    /// block is replaced by a fresh node whose children are the
    /// alternatives.
    fn parse_variants_block(
        &mut self,
        lexer: &mut Lexer,
        node: Node,
        indent: i32,
        var_indent: i32,
        var_name: &Option<String>,
        meta: &mut Meta,
    ) -> ParseResult<Node> {
        let mut already_default = false;
        let axis_not_expanded = !self
            .expand_defaults
            .contains(&var_name.clone().unwrap_or_default());

        let shared_child = std::rc::Rc::new(node);
        let mut group = Node::new();

        loop {
            lexer.set_prev_indent(var_indent);
            let token = lexer.get_next_check_no_white(&[
                TokenKind::Identifier,
                TokenKind::Default,
                TokenKind::Indent,
                TokenKind::EndBlock,
            ])?;
            let token = match token.kind() {
                TokenKind::EndBlock => break,
                TokenKind::Indent => {
                    lexer.get_next_check_no_white(&[TokenKind::Variant])?;
                    lexer.get_next_check_no_white(&[TokenKind::Identifier, TokenKind::Default])?
                }
                _ => token,
            };

            let mut is_default = token.is(TokenKind::Default);
            let name_tokens = if is_default {
                lexer.get_until_check(
                    &[TokenKind::Identifier, TokenKind::Dot],
                    &[TokenKind::Colon],
                )?
            } else {
                let mut tokens = vec![token];
                tokens.extend(lexer.get_until_check(
                    &[TokenKind::Identifier, TokenKind::Dot],
                    &[TokenKind::Colon],
                )?);
                tokens
            };

            let (names, raw_name): (Vec<String>, Vec<String>) = if name_tokens.len() == 2 {
                let name = name_tokens[0].text().unwrap_or_default().to_owned();
                (vec![name.clone()], vec![name])
            } else {
                let body = &name_tokens[..name_tokens.len().saturating_sub(1)];
                let raw = body.iter().map(Token::to_string).collect();
                let names = body
                    .iter()
                    .filter_map(|t| match t {
                        Token::Identifier(name) => Some(name.clone()),
                        _ => None,
                    })
                    .collect();
                (names, raw)
            };

            // Dependencies follow the colon on the same line.
            let mut token = lexer.next_token()?;
            while token.is(TokenKind::White) {
                token = lexer.next_token()?;
            }
            let deps: FilterExpr = if !token.is(TokenKind::EndL) {
                let mut tokens = vec![token];
                tokens.extend(lexer.get_until(&[TokenKind::EndL])?);
                Self::parse_filter_tokens(lexer, tokens)?
            } else {
                Vec::new()
            };

            let mut wrapper = Node::new();
            wrapper.children = vec![std::rc::Rc::clone(&shared_child)];
            wrapper.labels = shared_child.labels.clone();
            if let Some(axis) = var_name {
                let op = Operation::Set {
                    key: axis.clone(),
                    value: names.join("."),
                };
                wrapper.content.push(entry_at(lexer, ContentItem::Op(op)));
            }

            let mut variant = self.parse_block(lexer, wrapper, indent, false)?;

            variant.axis_name = var_name.clone();
            variant.name = match var_name {
                Some(axis) => names
                    .iter()
                    .map(|n| Label::with_axis(axis.clone(), n.clone()))
                    .collect(),
                None => names.iter().map(|n| Label::new(n.clone())).collect(),
            };
            variant.dep = deps;

            if let Some(declared) = meta.get_mut("default") {
                declared.retain(|value| match value {
                    MetaValue::Tokens(tokens) => {
                        let matched = tokens.iter().zip(&raw_name).all(|(a, b)| a == b);
                        if matched {
                            is_default = true;
                        }
                        !matched
                    }
                    MetaValue::Flag => true,
                });
            }

            if is_default && !already_default && axis_not_expanded {
                variant.is_default = true;
                already_default = true;
            }
            variant.append_to_shortname = !is_default;

            let long_path = join_long_names(&variant.name);
            let short_path = join_values(&variant.name);
            let op = Operation::update_file_map(lexer.filename(), long_path, NAME_MAP_FILE);
            variant.content.push(entry_at(lexer, ContentItem::Op(op)));
            let op = Operation::update_file_map(lexer.filename(), short_path, SHORT_NAME_MAP_FILE);
            variant.content.push(entry_at(lexer, ContentItem::Op(op)));

            group.labels.merge(&variant.labels);
            for label in &variant.name {
                group.labels.insert(label);
            }
            if variant.is_default && self.defaults {
                // Defaults go first so enumeration can stop early.
                group.children.insert(0, std::rc::Rc::new(variant));
            } else {
                group.children.push(std::rc::Rc::new(variant));
            }
        }

        if let Some(declared) = meta.get("default") {
            if !declared.is_empty() {
                let rendered: Vec<String> = declared
                    .iter()
                    .map(|v| match v {
                        MetaValue::Tokens(tokens) => tokens.concat(),
                        MetaValue::Flag => "default".to_owned(),
                    })
                    .collect();
                return Err(self.syntax_error(
                    lexer,
                    format!("Missing default variant {rendered:?}"),
                ));
            }
        }
        Ok(group)
    }

    /// Parses a filter expression from a token list.
    ///
    /// `,` separates disjuncts, `..` conjuncts, and `.` chains adjacent
    /// labels; whitespace between terms also separates disjuncts.
    /// `(axis)` and `(axis=value)` build qualified labels.
    pub fn parse_filter_tokens(lexer: &Lexer, tokens: Vec<Token>) -> ParseResult<FilterExpr> {
        let mut iter = tokens.into_iter().chain(std::iter::once(Token::EndL));
        let mut or_filters: FilterExpr = Vec::new();
        let mut and_filter: Vec<Vec<Label>> = Vec::new();
        let mut con_filter: Vec<Label> = Vec::new();
        let mut dots = 1usize;

        let mut token = lexer.check_token(
            next_or_end(&mut iter),
            &[
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::EndL,
                TokenKind::White,
            ],
        )?;

        while !token.is(TokenKind::EndL) {
            match token.kind() {
                TokenKind::Identifier | TokenKind::LParen => {
                    let label = if token.is(TokenKind::LParen) {
                        let ident =
                            lexer.check_token(next_no_white(&mut iter), &[TokenKind::Identifier])?;
                        let next = lexer.check_token(
                            next_no_white(&mut iter),
                            &[TokenKind::Set, TokenKind::RParen],
                        )?;
                        if next.is(TokenKind::RParen) {
                            Label::new(ident.text().unwrap_or_default())
                        } else {
                            let value = lexer.check_token(
                                next_no_white(&mut iter),
                                &[TokenKind::Identifier, TokenKind::Str],
                            )?;
                            lexer.check_token(next_no_white(&mut iter), &[TokenKind::RParen])?;
                            Label::with_axis(
                                ident.text().unwrap_or_default(),
                                value.text().unwrap_or_default(),
                            )
                        }
                    } else {
                        Label::new(token.text().unwrap_or_default())
                    };
                    match dots {
                        1 => con_filter.push(label),
                        2 => {
                            and_filter.push(std::mem::take(&mut con_filter));
                            con_filter = vec![label];
                        }
                        _ => {
                            return Err(filter_error(
                                lexer,
                                "Syntax Error expected '.' between Identifier.",
                            ))
                        }
                    }
                    dots = 0;
                }
                TokenKind::Dot => dots += 1,
                TokenKind::Comma | TokenKind::White => {
                    if dots > 0 {
                        return Err(filter_error(
                            lexer,
                            "Syntax Error expected identifier between '.' and ','.",
                        ));
                    }
                    if !and_filter.is_empty() {
                        if !con_filter.is_empty() {
                            and_filter.push(std::mem::take(&mut con_filter));
                        }
                        or_filters.push(std::mem::take(&mut and_filter));
                    } else if !con_filter.is_empty() {
                        or_filters.push(vec![std::mem::take(&mut con_filter)]);
                    } else {
                        return Err(filter_error(
                            lexer,
                            "Syntax Error expected ',' between Identifier.",
                        ));
                    }
                    dots = 1;
                    token = lexer.check_token(
                        next_no_white(&mut iter),
                        &[
                            TokenKind::Identifier,
                            TokenKind::Comma,
                            TokenKind::Dot,
                            TokenKind::LParen,
                            TokenKind::EndL,
                        ],
                    )?;
                    continue;
                }
                _ => {}
            }
            token = lexer.check_token(
                next_or_end(&mut iter),
                &[
                    TokenKind::Identifier,
                    TokenKind::Comma,
                    TokenKind::Dot,
                    TokenKind::LParen,
                    TokenKind::EndL,
                    TokenKind::White,
                ],
            )?;
        }

        if !and_filter.is_empty() {
            if !con_filter.is_empty() {
                and_filter.push(std::mem::take(&mut con_filter));
            }
            or_filters.push(and_filter);
        }
        if !con_filter.is_empty() {
            or_filters.push(vec![con_filter]);
        }
        Ok(or_filters)
    }

    fn syntax_error(&self, lexer: &Lexer, msg: impl Into<String>) -> ParseError {
        ParseError::syntax(msg, lexer.line(), lexer.filename(), lexer.linenum())
    }
}

fn filter_error(lexer: &Lexer, msg: &str) -> ParseError {
    ParseError::syntax(msg, lexer.line(), lexer.filename(), lexer.linenum())
}

fn next_or_end(iter: &mut impl Iterator<Item = Token>) -> Token {
    iter.next().unwrap_or(Token::EndL)
}

fn next_no_white(iter: &mut impl Iterator<Item = Token>) -> Token {
    loop {
        match iter.next() {
            Some(token) if token.is(TokenKind::White) => continue,
            Some(token) => return token,
            None => return Token::EndL,
        }
    }
}

fn entry_at(lexer: &Lexer, item: ContentItem) -> ContentEntry {
    ContentEntry {
        filename: lexer.filename().to_owned(),
        linenum: lexer.linenum(),
        item,
    }
}

fn flush_pre_dict(lexer: &Lexer, node: &mut Node, pre_dict: &mut VarDict) {
    let dict = std::mem::take(pre_dict);
    node.content.push(entry_at(
        lexer,
        ContentItem::Op(Operation::ApplyPreDict { dict }),
    ));
}

/// Strips a fully-enclosing pair of single or double quotes.
fn strip_quotes(value: &str) -> String {
    let bytes = value.as_bytes();
    if let (Some(first), Some(last)) = (bytes.first(), bytes.last()) {
        if first == last && (*first == b'"' || *first == b'\'') {
            if value.len() == 1 {
                return String::new();
            }
            return value[1..value.len() - 1].to_owned();
        }
    }
    value.to_owned()
}

/// Expands a leading `~` to the user's home directory.
fn expand_user(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
