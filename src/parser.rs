use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use crate::config::{FuncMap, LexMode, ParseOptions};
use crate::lexer::{LexErrorKind, Lexer};
use crate::node::{ActionNode, ListNode, Marker, Node};
use crate::stream::{TokenSource, TokenStream};
use crate::token::{Keyword, Token, TokenKind};

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The lexer rejected the input.
    Lex(LexErrorKind),
    /// A closing keyword with no construct open.
    Unexpected { found: String },
    /// A non-empty template redefined a non-empty template.
    MultipleDefinition { name: String },
    /// More tokens pushed back than the lookahead buffer holds.
    LookaheadOverflow,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(kind) => write!(f, "{kind}"),
            Self::Unexpected { found } => write!(f, "unexpected {found}"),
            Self::MultipleDefinition { name } => {
                write!(f, "multiple definition of template {name:?}")
            }
            Self::LookaheadOverflow => f.write_str("lookahead overflow"),
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("template: {template}:{line}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Name of the top-level template being parsed.
    pub template: String,
    pub line: usize,
}

impl ParseError {
    /// Whether the input failed to tokenize.
    #[must_use]
    pub const fn is_lex(&self) -> bool {
        matches!(self.kind, ParseErrorKind::Lex(_))
    }

    /// Whether the tokens did not form a valid template.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        !self.is_lex()
    }
}

/// Parse `text` as a template called `name` and return the resulting set.
///
/// # Errors
///
/// Returns `ParseError` when the text does not tokenize or does not form
/// a valid template.
pub fn parse(name: &str, text: &str) -> Result<TreeSet, ParseError> {
    parse_with(name, text, &ParseOptions::default())
}

/// Like [`parse`], with explicit options.
///
/// # Errors
///
/// Returns `ParseError` when the text does not tokenize or does not form
/// a valid template.
#[tracing::instrument(skip_all, fields(name = name, source_len = text.len()))]
pub fn parse_with(name: &str, text: &str, options: &ParseOptions) -> Result<TreeSet, ParseError> {
    let mut tree_set = TreeSet::new();
    Tree::new(name).parse(text, &mut tree_set, options)?;
    Ok(tree_set)
}

/// Named collection of parsed templates.
#[derive(Debug, Default)]
pub struct TreeSet {
    trees: HashMap<String, Tree>,
}

impl TreeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tree> {
        self.trees.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Template names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tree)> {
        self.trees.iter().map(|(name, tree)| (name.as_str(), tree))
    }

    pub fn clear(&mut self) {
        self.trees.clear();
    }

    #[must_use]
    pub fn into_inner(self) -> HashMap<String, Tree> {
        self.trees
    }

    /// Register `tree`. An existing non-empty tree survives an empty
    /// redefinition; conflicting definitions are rejected before this
    /// point.
    fn add(&mut self, tree: Tree) -> &Tree {
        match self.trees.entry(tree.name.clone()) {
            Entry::Vacant(entry) => {
                tracing::debug!(name = %tree.name, "template registered");
                entry.insert(tree)
            }
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                if slot.is_empty() {
                    tracing::debug!(name = %tree.name, "empty template replaced");
                    *slot = tree;
                }
                slot
            }
        }
    }
}

/// What a single action boundary produced.
enum Step {
    Node(Node),
    Marker(Marker),
}

/// The representation of a single parsed template.
pub struct Tree {
    name: String,
    parse_name: String,
    root: Option<ListNode>,
    text: String,
    // Parsing only; cleared after parse.
    funcs: Vec<FuncMap>,
    lex: Option<Box<dyn TokenSource + Send>>,
    /// Most recent token first.
    token: [Token; 3],
    peek_count: usize,
    // Valid entries in `token`.
    buffered: usize,
    vars: Vec<String>,
}

impl Tree {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parse_name: String::new(),
            root: None,
            text: String::new(),
            funcs: Vec::new(),
            lex: None,
            token: Default::default(),
            peek_count: 0,
            buffered: 0,
            vars: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the top-level template this tree was parsed under.
    #[must_use]
    pub fn parse_name(&self) -> &str {
        &self.parse_name
    }

    #[must_use]
    pub const fn root(&self) -> Option<&ListNode> {
        self.root.as_ref()
    }

    /// Source text the tree was parsed from.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the tree has no content besides empty lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.as_ref().is_none_or(ListNode::is_empty_tree)
    }

    /// Parse `text` into this tree and register it in `tree_set`.
    ///
    /// Returns the tree registered under this name afterwards. That is
    /// the existing one when this tree came out empty and the existing
    /// one is not.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` on lexical or syntax errors, or when both this
    /// tree and an existing tree of the same name are non-empty. On error
    /// `tree_set` is emptied.
    #[tracing::instrument(skip_all, fields(name = %self.name, source_len = text.len()))]
    pub fn parse<'s>(
        mut self,
        text: &str,
        tree_set: &'s mut TreeSet,
        options: &ParseOptions,
    ) -> Result<&'s Self, ParseError> {
        self.parse_name.clone_from(&self.name);
        self.text = text.to_string();
        let lex: Box<dyn TokenSource + Send> = match options.mode() {
            LexMode::Concurrent => match TokenStream::spawn(text) {
                Ok(stream) => Box::new(stream),
                Err(err) => {
                    tracing::warn!(error = %err, "cannot start lexer thread, lexing inline");
                    Box::new(Lexer::new(text))
                }
            },
            LexMode::Inline => Box::new(Lexer::new(text)),
        };
        self.start_parse(options.funcs().to_vec(), lex);

        let outcome = self
            .parse_body()
            .and_then(|()| self.check_redefinition(tree_set));
        self.stop_parse();

        if let Err(err) = outcome {
            tracing::debug!(error = %err, "parse failed");
            self.root = None;
            tree_set.clear();
            return Err(err);
        }
        Ok(tree_set.add(self))
    }

    fn start_parse(&mut self, funcs: Vec<FuncMap>, lex: Box<dyn TokenSource + Send>) {
        self.root = None;
        self.lex = Some(lex);
        self.peek_count = 0;
        self.buffered = 0;
        self.vars = vec!["$".to_string()];
        self.funcs = funcs;
    }

    fn stop_parse(&mut self) {
        self.lex = None;
        self.token = Default::default();
        self.peek_count = 0;
        self.buffered = 0;
        self.vars.clear();
        self.funcs.clear();
    }

    fn check_redefinition(&self, tree_set: &TreeSet) -> Result<(), ParseError> {
        match tree_set.get(&self.name) {
            Some(existing) if !existing.is_empty() && !self.is_empty() => {
                Err(self.error(ParseErrorKind::MultipleDefinition {
                    name: self.name.clone(),
                }))
            }
            _ => Ok(()),
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            template: self.parse_name.clone(),
            line: self.line_number(),
        }
    }

    fn line_number(&self) -> usize {
        self.lex.as_ref().map_or(1, |lex| lex.line_number())
    }

    /// Pull a token from the lexer. Error tokens end the parse here.
    fn read(&mut self) -> Result<Token, ParseError> {
        let token = self
            .lex
            .as_mut()
            .map_or_else(Token::default, |lex| lex.next_token());
        if let TokenKind::Error(kind) = &token.kind {
            return Err(self.error(ParseErrorKind::Lex(kind.clone())));
        }
        Ok(token)
    }

    /// Read a fresh token into the front of the buffer, shifting older
    /// ones back.
    fn shift_in(&mut self) -> Result<(), ParseError> {
        let token = self.read()?;
        self.token.rotate_right(1);
        self.token[0] = token;
        self.buffered = (self.buffered + 1).min(self.token.len());
        Ok(())
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        if self.peek_count > 0 {
            self.peek_count -= 1;
        } else {
            self.shift_in()?;
        }
        Ok(self.token[self.peek_count].clone())
    }

    /// Back the input up one token. Up to three consumed tokens can be
    /// pushed back.
    fn backup(&mut self) -> Result<(), ParseError> {
        if self.peek_count >= self.buffered {
            return Err(self.error(ParseErrorKind::LookaheadOverflow));
        }
        self.peek_count += 1;
        Ok(())
    }

    fn peek(&mut self) -> Result<Token, ParseError> {
        if self.peek_count == 0 {
            self.shift_in()?;
            self.peek_count = 1;
        }
        Ok(self.token[self.peek_count - 1].clone())
    }

    fn next_non_space(&mut self) -> Result<Token, ParseError> {
        loop {
            let token = self.next()?;
            if token.kind != TokenKind::Space {
                return Ok(token);
            }
        }
    }

    /// Like `next_non_space`, also skipping line ends.
    fn next_non_blank(&mut self) -> Result<Token, ParseError> {
        loop {
            let token = self.next()?;
            if !matches!(token.kind, TokenKind::Space | TokenKind::EndOfLine) {
                return Ok(token);
            }
        }
    }

    /// Top-level body of a template. Runs to end of input.
    fn parse_body(&mut self) -> Result<(), ParseError> {
        let mut root = ListNode::new(self.peek()?.pos);
        loop {
            let token = self.next_non_blank()?;
            if token.kind == TokenKind::EndOfInput {
                break;
            }
            self.backup()?;
            match self.parse_action()? {
                Step::Node(node) => root.append(node),
                Step::Marker(marker) => {
                    return Err(self.error(ParseErrorKind::Unexpected {
                        found: marker.to_string(),
                    }));
                }
            }
        }
        self.root = Some(root);
        Ok(())
    }

    /// Action:
    ///  control keyword
    ///  tokens up to the end of the line
    fn parse_action(&mut self) -> Result<Step, ParseError> {
        let token = self.next_non_space()?;
        match token.kind {
            TokenKind::Keyword(Keyword::End) => return Ok(Step::Marker(Marker::End)),
            TokenKind::Keyword(Keyword::Else) => return Ok(Step::Marker(Marker::Else)),
            _ => {}
        }
        self.backup()?;
        // Do not pop variables; they persist until "end".
        let action = ActionNode::new(self.peek()?.pos, self.line_number());
        self.skip_to_line_end()?;
        Ok(Step::Node(Node::Action(action)))
    }

    /// Consume the rest of the current action, leaving end of input
    /// unread.
    fn skip_to_line_end(&mut self) -> Result<(), ParseError> {
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::EndOfLine => return Ok(()),
                TokenKind::EndOfInput => {
                    self.backup()?;
                    return Ok(());
                }
                _ => {}
            }
        }
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("name", &self.name)
            .field("parse_name", &self.parse_name)
            .field("root", &self.root)
            .field("parsing", &self.lex.is_some())
            .field("vars", &self.vars)
            .field("funcs", &self.funcs.len())
            .finish_non_exhaustive()
    }
}
