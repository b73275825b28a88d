use std::fmt;

use crate::lexer::LexErrorKind;

/// Byte offset into the template source.
pub type Pos = usize;

/// Reserved control keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `else`
    Else,
    /// `end`
    End,
    /// `if`
    If,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TokenKind {
    /// Scan failure; the token value holds the rendered message.
    Error(LexErrorKind),
    /// End of the source. Always the last token of a successful scan.
    #[default]
    EndOfInput,
    /// Alphanumeric identifier not starting with `.`.
    Identifier,
    /// Alphanumeric identifier starting with `.`.
    Field,
    /// Simple number, including imaginary.
    Number,
    /// Complex constant (`1+2i`).
    Complex,
    /// `true` or `false`.
    Bool,
    /// The untyped `nil` constant.
    Nil,
    /// Control keyword.
    Keyword(Keyword),
    /// Run of spaces or tabs.
    Space,
    /// A single `\r` or `\n`.
    EndOfLine,
}

impl TokenKind {
    /// Whether no token can follow this one.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::EndOfInput)
    }
}

/// Look up a reserved word.
#[must_use]
pub fn keyword(word: &str) -> Option<TokenKind> {
    match word {
        "else" => Some(TokenKind::Keyword(Keyword::Else)),
        "end" => Some(TokenKind::Keyword(Keyword::End)),
        "if" => Some(TokenKind::Keyword(Keyword::If)),
        "nil" => Some(TokenKind::Nil),
        _ => None,
    }
}

/// A single token with its kind, source text, and byte position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: Pos,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::EndOfInput => write!(f, "EOF"),
            TokenKind::Error(_) => write!(f, "{}", self.value),
            TokenKind::Keyword(_) | TokenKind::Nil => write!(f, "<{}>", self.value),
            _ if self.value.chars().count() > 10 => {
                let head: String = self.value.chars().take(10).collect();
                write!(f, "{head:?}...")
            }
            _ => write!(f, "{:?}", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, value: &str) -> Token {
        Token {
            kind,
            value: value.to_string(),
            pos: 0,
        }
    }

    #[test]
    fn keyword_table() {
        assert_eq!(keyword("end"), Some(TokenKind::Keyword(Keyword::End)));
        assert_eq!(keyword("nil"), Some(TokenKind::Nil));
        assert_eq!(keyword("range"), None);
        assert_eq!(keyword("true"), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(token(TokenKind::EndOfInput, "").to_string(), "EOF");
        assert_eq!(
            token(TokenKind::Keyword(Keyword::If), "if").to_string(),
            "<if>"
        );
        assert_eq!(token(TokenKind::Identifier, "abc").to_string(), "\"abc\"");
        assert_eq!(
            token(TokenKind::Identifier, "abcdefghijklm").to_string(),
            "\"abcdefghij\"..."
        );
    }

    #[test]
    fn terminal_kinds() {
        assert!(TokenKind::EndOfInput.is_terminal());
        assert!(TokenKind::Error(LexErrorKind::BadCharacter('$')).is_terminal());
        assert!(!TokenKind::Space.is_terminal());
    }
}
