use std::fmt;
use std::iter::FusedIterator;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::token::{self, Pos, Token, TokenKind};

const DECIMAL_DIGITS: &str = "0123456789";
const HEX_DIGITS: &str = "0123456789abcdefABCDEF";

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Malformed numeric literal; holds the text scanned so far.
    BadNumber(String),
    /// Character that may not directly follow an identifier.
    BadCharacter(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadNumber(lexeme) => {
                write!(f, "bad number syntax: {lexeme:?}")
            }
            Self::BadCharacter(ch) => {
                write!(f, "bad character U+{:04X} '{ch}'", u32::from(*ch))
            }
        }
    }
}

/// Error produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub pos: Pos,
    pub line: usize,
}

/// Tokenize a whole template source.
///
/// The returned tokens end with the `EndOfInput` token, so their values
/// concatenate back to `input`.
///
/// # Errors
///
/// Returns `LexError` on a malformed number or a bad character after an
/// identifier.
#[tracing::instrument(skip_all, fields(source_len = input.len()))]
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token();
        match &token.kind {
            TokenKind::Error(kind) => {
                return Err(LexError {
                    kind: kind.clone(),
                    pos: token.pos,
                    line: lexer.line_number(),
                });
            }
            TokenKind::EndOfInput => {
                tokens.push(token);
                return Ok(tokens);
            }
            _ => tokens.push(token),
        }
    }
}

/// Scanner states. Each one runs until it has emitted at most one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Action,
    Space,
    Number,
    Identifier,
}

/// Template scanner.
///
/// Tokens are produced lazily: every call to [`Lexer::next_token`] runs
/// the state machine until exactly one token is emitted. Once the
/// terminal token (end of input or an error) has been returned, further
/// calls yield an empty end-of-input token.
#[derive(Debug, Clone)]
pub struct Lexer {
    source: Arc<str>,
    state: Option<State>,
    pos: Pos,
    start: Pos,
    width: Pos,
    last_pos: Pos,
    pending: Option<Token>,
    exhausted: bool,
}

impl Lexer {
    #[must_use]
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
            state: Some(State::Action),
            pos: 0,
            start: 0,
            width: 0,
            last_pos: 0,
            pending: None,
            exhausted: false,
        }
    }

    /// Run the state machine until the next token is ready.
    pub fn next_token(&mut self) -> Token {
        loop {
            if let Some(token) = self.pending.take() {
                self.last_pos = token.pos;
                return token;
            }
            let Some(state) = self.state else {
                return Token {
                    kind: TokenKind::EndOfInput,
                    value: String::new(),
                    pos: self.source.len(),
                };
            };
            self.state = self.step(state);
        }
    }

    /// Line of the most recently returned token, counting from 1.
    #[must_use]
    pub fn line_number(&self) -> usize {
        1 + self.source[..self.last_pos].matches('\n').count()
    }

    fn step(&mut self, state: State) -> Option<State> {
        match state {
            State::Action => self.lex_action(),
            State::Space => Some(self.lex_space()),
            State::Number => self.lex_number(),
            State::Identifier => self.lex_identifier(),
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let Some(ch) = self.source[self.pos..].chars().next() else {
            self.width = 0;
            return None;
        };
        self.width = ch.len_utf8();
        self.pos += self.width;
        Some(ch)
    }

    /// Step back one char. Only valid once per `next_char`.
    const fn backup(&mut self) {
        self.pos -= self.width;
    }

    fn peek_char(&mut self) -> Option<char> {
        let ch = self.next_char();
        self.backup();
        ch
    }

    fn accept(&mut self, valid: &str) -> bool {
        if self.next_char().is_some_and(|ch| valid.contains(ch)) {
            return true;
        }
        self.backup();
        false
    }

    fn accept_run(&mut self, valid: &str) {
        while self.next_char().is_some_and(|ch| valid.contains(ch)) {}
        self.backup();
    }

    fn emit(&mut self, kind: TokenKind) {
        let token = Token {
            kind,
            value: self.source[self.start..self.pos].to_string(),
            pos: self.start,
        };
        tracing::trace!(kind = ?token.kind, pos = token.pos, "emit");
        self.pending = Some(token);
        self.start = self.pos;
    }

    fn errorf(&mut self, kind: LexErrorKind) -> Option<State> {
        tracing::trace!(pos = self.start, error = %kind, "lex error");
        self.pending = Some(Token {
            value: kind.to_string(),
            kind: TokenKind::Error(kind),
            pos: self.start,
        });
        None
    }

    fn lex_action(&mut self) -> Option<State> {
        match self.next_char() {
            None => {
                self.emit(TokenKind::EndOfInput);
                None
            }
            Some(ch) if is_end_of_line(ch) => {
                self.emit(TokenKind::EndOfLine);
                Some(State::Action)
            }
            Some(ch) if is_space(ch) => Some(State::Space),
            Some('+' | '-' | '0'..='9') => {
                self.backup();
                Some(State::Number)
            }
            Some(ch) if is_alphanumeric(ch) => {
                self.backup();
                Some(State::Identifier)
            }
            // Punctuation is not tokenized yet; it stays in front of
            // whatever token is emitted next.
            Some(_) => Some(State::Action),
        }
    }

    /// One space has already been consumed.
    fn lex_space(&mut self) -> State {
        while self.peek_char().is_some_and(is_space) {
            self.next_char();
        }
        self.emit(TokenKind::Space);
        State::Action
    }

    fn lex_number(&mut self) -> Option<State> {
        if !self.scan_number() {
            return self.bad_number();
        }
        if matches!(self.peek_char(), Some('+' | '-')) {
            // Complex: 1+2i. No spaces, must end in 'i'.
            if !self.scan_number() || !self.source[..self.pos].ends_with('i') {
                return self.bad_number();
            }
            self.emit(TokenKind::Complex);
        } else {
            self.emit(TokenKind::Number);
        }
        Some(State::Action)
    }

    fn bad_number(&mut self) -> Option<State> {
        let lexeme = self.source[self.start..self.pos].to_string();
        self.errorf(LexErrorKind::BadNumber(lexeme))
    }

    /// Accepts more than strictly valid numbers (`089`, `0x0.2`); a later
    /// conversion step is expected to reject those.
    fn scan_number(&mut self) -> bool {
        self.accept("+-");
        let digits = if self.accept("0") && self.accept("xX") {
            HEX_DIGITS
        } else {
            DECIMAL_DIGITS
        };
        self.accept_run(digits);
        if self.accept(".") {
            self.accept_run(digits);
        }
        if self.accept("eE") {
            self.accept("+-");
            self.accept_run(DECIMAL_DIGITS);
        }
        // imaginary
        self.accept("i");
        if self.peek_char().is_some_and(is_alphanumeric) {
            self.next_char();
            return false;
        }
        true
    }

    fn lex_identifier(&mut self) -> Option<State> {
        let stop = loop {
            match self.next_char() {
                Some(ch) if is_alphanumeric(ch) => {}
                other => {
                    self.backup();
                    break other;
                }
            }
        };
        if !self.at_terminator() {
            if let Some(ch) = stop {
                return self.errorf(LexErrorKind::BadCharacter(ch));
            }
        }

        let word = &self.source[self.start..self.pos];
        let kind = if let Some(kind) = token::keyword(word) {
            kind
        } else if word.starts_with('.') {
            TokenKind::Field
        } else if word == "true" || word == "false" {
            TokenKind::Bool
        } else {
            TokenKind::Identifier
        };
        self.emit(kind);
        Some(State::Action)
    }

    /// Whether the next char may end an identifier. Splits `.x.y` into
    /// two pieces and rejects `x+2` without spaces.
    fn at_terminator(&mut self) -> bool {
        match self.peek_char() {
            None | Some('.' | ',' | '|' | ':' | ')' | '(') => true,
            Some(ch) => is_space(ch) || is_end_of_line(ch),
        }
    }
}

impl Iterator for Lexer {
    type Item = Token;

    /// Yields every token up to and including the terminal one.
    fn next(&mut self) -> Option<Token> {
        if self.exhausted {
            return None;
        }
        let token = self.next_token();
        self.exhausted = token.kind.is_terminal();
        Some(token)
    }
}

impl FusedIterator for Lexer {}

const fn is_space(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

const fn is_end_of_line(ch: char) -> bool {
    ch == '\r' || ch == '\n'
}

/// Letters (general category L), decimal digits (Nd) and `_`. Marks,
/// letter-like numbers and other numerics such as `²` are excluded.
fn is_alphanumeric(ch: char) -> bool {
    static WORD: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[\p{L}\p{Nd}_]$").expect("word class pattern is valid"));

    if ch.is_ascii() {
        return ch == '_' || ch.is_ascii_alphanumeric();
    }
    WORD.is_match(ch.encode_utf8(&mut [0; 4]))
}
