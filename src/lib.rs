//! Lexer and parser for a small action-based template language.
//!
//! Source text is scanned into typed tokens by a state-machine lexer,
//! which by default runs on its own thread and hands tokens to a
//! recursive-descent parser one at a time. The parser builds one
//! [`Tree`] per template name and collects them in a [`TreeSet`].
//!
//! # Quick start
//!
//! ## Parse a template
//!
//! ```
//! use tmpl_parse::{NodeType, parse};
//!
//! let set = parse("greeting", "hello .Name\nif true\n").unwrap();
//! let tree = set.get("greeting").unwrap();
//! let root = tree.root().unwrap();
//! assert_eq!(root.nodes().len(), 2);
//! assert_eq!(root.nodes()[0].node_type(), NodeType::Action);
//! ```
//!
//! ## Inspect the tokens
//!
//! ```
//! use tmpl_parse::{TokenKind, tokenize};
//!
//! let tokens = tokenize(".Count 0x1F").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Field);
//! assert_eq!(tokens[2].kind, TokenKind::Number);
//! let text: String = tokens.iter().map(|t| t.value.as_str()).collect();
//! assert_eq!(text, ".Count 0x1F");
//! ```
//!
//! ## Errors
//!
//! ```
//! let err = tmpl_parse::parse("page", "title\nend").unwrap_err();
//! assert_eq!(err.to_string(), "template: page:2: unexpected {{end}}");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod config;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod stream;
pub mod token;

pub use config::{Func, FuncMap, LexMode, ParseOptions};
pub use lexer::{LexError, LexErrorKind, Lexer, tokenize};
pub use node::{ActionNode, CommandNode, ListNode, Node, NodeType, VariableNode, is_empty_tree};
pub use parser::{ParseError, ParseErrorKind, Tree, TreeSet, parse, parse_with};
pub use stream::{TokenSource, TokenStream};
pub use token::{Keyword, Pos, Token, TokenKind};
