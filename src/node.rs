//! Parse nodes.
//!
//! The node set is closed: every variant is built by the parser, and
//! callers only get read access.

use std::fmt;

use crate::token::Pos;

/// Identifies the variant of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    List,
    Action,
    Command,
    Variable,
}

/// An element of a parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    List(ListNode),
    Action(ActionNode),
    Command(CommandNode),
    Variable(VariableNode),
}

impl Node {
    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        match self {
            Self::List(_) => NodeType::List,
            Self::Action(_) => NodeType::Action,
            Self::Command(_) => NodeType::Command,
            Self::Variable(_) => NodeType::Variable,
        }
    }

    /// Byte offset where the node starts in the source.
    #[must_use]
    pub const fn pos(&self) -> Pos {
        match self {
            Self::List(n) => n.pos,
            Self::Action(n) => n.pos,
            Self::Command(n) => n.pos,
            Self::Variable(n) => n.pos,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(n) => fmt::Display::fmt(n, f),
            Self::Action(n) => fmt::Display::fmt(n, f),
            Self::Command(n) => fmt::Display::fmt(n, f),
            Self::Variable(n) => fmt::Display::fmt(n, f),
        }
    }
}

/// Sequence of nodes in lexical order. Root of every template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNode {
    pos: Pos,
    nodes: Vec<Node>,
}

impl ListNode {
    pub(crate) const fn new(pos: Pos) -> Self {
        Self {
            pos,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn append(&mut self, node: Node) {
        self.nodes.push(node);
    }

    #[must_use]
    pub const fn pos(&self) -> Pos {
        self.pos
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Whether every child is empty. See [`is_empty_tree`].
    #[must_use]
    pub fn is_empty_tree(&self) -> bool {
        self.nodes.iter().all(|node| is_empty_tree(Some(node)))
    }
}

impl fmt::Display for ListNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

/// A dynamic evaluation point. No pipeline is attached yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionNode {
    pos: Pos,
    line: usize,
}

impl ActionNode {
    pub(crate) const fn new(pos: Pos, line: usize) -> Self {
        Self { pos, line }
    }

    #[must_use]
    pub const fn pos(&self) -> Pos {
        self.pos
    }

    /// Line the action starts on, for diagnostics.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Display for ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{}}}}")
    }
}

/// One stage of a pipeline: a command and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNode {
    pos: Pos,
    args: Vec<Node>,
}

impl CommandNode {
    /// Empty command at `pos`. The parser does not build pipelines yet,
    /// so commands are only assembled by callers.
    #[must_use]
    pub const fn new(pos: Pos) -> Self {
        Self {
            pos,
            args: Vec::new(),
        }
    }

    pub fn append(&mut self, arg: Node) {
        self.args.push(arg);
    }

    #[must_use]
    pub const fn pos(&self) -> Pos {
        self.pos
    }

    #[must_use]
    pub fn args(&self) -> &[Node] {
        &self.args
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

/// Variable reference chain such as `$x.field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableNode {
    pos: Pos,
    ident: Vec<String>,
}

impl VariableNode {
    /// Split a dotted reference like `$x.field` into its parts.
    #[must_use]
    pub fn new(pos: Pos, ident: &str) -> Self {
        Self {
            pos,
            ident: ident.split('.').map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub const fn pos(&self) -> Pos {
        self.pos
    }

    #[must_use]
    pub fn ident(&self) -> &[String] {
        &self.ident
    }
}

impl fmt::Display for VariableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident.join("."))
    }
}

/// Closing keyword read where an action was expected. Never part of a
/// tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    End,
    Else,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => write!(f, "{{{{end}}}}"),
            Self::Else => write!(f, "{{{{else}}}}"),
        }
    }
}

/// Reports whether `node` holds nothing but empty lists.
///
/// A missing node and a list of empty nodes are empty; actions, commands
/// and variables always count as content.
#[must_use]
pub fn is_empty_tree(node: Option<&Node>) -> bool {
    match node {
        None => true,
        Some(Node::List(list)) => list.is_empty_tree(),
        Some(Node::Action(_) | Node::Command(_) | Node::Variable(_)) => false,
    }
}
