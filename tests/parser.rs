//! Parser behaviour and error tests.

mod common;

use common::{node_count, sorted_names};
use tmpl_parse::{
    CommandNode, LexErrorKind, LexMode, Node, NodeType, ParseErrorKind, ParseOptions, Tree,
    TreeSet, VariableNode, is_empty_tree, parse, parse_with,
};

fn parse_into(set: &mut TreeSet, name: &str, text: &str) -> Result<(), tmpl_parse::ParseError> {
    Tree::new(name)
        .parse(text, set, &ParseOptions::default())
        .map(|_| ())
}

// -----------------------------------------------------------
// Tree building.
// -----------------------------------------------------------

#[test]
fn parse_empty_template() {
    let set = parse("t", "").expect("parse");
    let tree = set.get("t").expect("tree");
    let root = tree.root().expect("root");
    assert!(root.nodes().is_empty());
    assert_eq!(root.to_string(), "");
    assert!(tree.is_empty());
}

#[test]
fn parse_whitespace_only_template_is_empty() {
    let set = parse("t", "  \n\t\n\n").expect("parse");
    assert_eq!(node_count(&set, "t"), 0);
    assert!(set.get("t").is_some_and(Tree::is_empty));
}

#[test]
fn parse_one_action_per_line() {
    let set = parse("t", "a b c\n\n  d\ne f").expect("parse");
    let root = set.get("t").and_then(Tree::root).expect("root");
    assert_eq!(root.nodes().len(), 3);
    assert!(
        root.nodes()
            .iter()
            .all(|n| n.node_type() == NodeType::Action)
    );
    assert_eq!(root.to_string(), "{{}}{{}}{{}}");
}

#[test]
fn parse_action_positions_and_lines() {
    let set = parse("t", "one\n  two\nthree").expect("parse");
    let root = set.get("t").and_then(Tree::root).expect("root");
    let found: Vec<_> = root
        .nodes()
        .iter()
        .map(|node| match node {
            Node::Action(action) => (action.pos(), action.line()),
            other => panic!("unexpected node {other:?}"),
        })
        .collect();
    assert_eq!(found, vec![(0, 1), (6, 2), (10, 3)]);
}

#[test]
fn parse_tree_metadata() {
    let text = "x\ny";
    let set = parse("main", text).expect("parse");
    let tree = set.get("main").expect("tree");
    assert_eq!(tree.name(), "main");
    assert_eq!(tree.parse_name(), "main");
    assert_eq!(tree.text(), text);
    assert_eq!(sorted_names(&set), vec!["main"]);
}

#[test]
fn parse_if_line_is_plain_action() {
    let set = parse("t", "if true").expect("parse");
    assert_eq!(node_count(&set, "t"), 1);
}

#[test]
fn parse_inline_mode_matches_concurrent() {
    let text = "a\nb c\n\nd";
    let inline = parse_with("t", text, &ParseOptions::new().lex_mode(LexMode::Inline))
        .expect("parse");
    let concurrent = parse("t", text).expect("parse");
    assert_eq!(
        inline.get("t").and_then(Tree::root),
        concurrent.get("t").and_then(Tree::root)
    );
}

#[test]
fn is_empty_tree_is_idempotent() {
    let set = parse("t", "a\nb").expect("parse");
    let root = set.get("t").and_then(Tree::root).expect("root").clone();
    let node = Node::List(root);
    let first = is_empty_tree(Some(&node));
    let second = is_empty_tree(Some(&node));
    assert_eq!(first, second);
    assert!(!first);
}

#[test]
fn command_and_variable_nodes_built_by_callers() {
    let mut command = CommandNode::new(3);
    command.append(Node::Variable(VariableNode::new(3, "$x.Name")));
    command.append(Node::Variable(VariableNode::new(11, "$")));
    assert_eq!(command.to_string(), "$x.Name $");
    assert_eq!(command.args().len(), 2);

    let node = Node::Command(command);
    assert_eq!(node.node_type(), NodeType::Command);
    assert!(!is_empty_tree(Some(&node)));
}

// -----------------------------------------------------------
// Redefinition.
// -----------------------------------------------------------

#[test]
fn redefinition_of_non_empty_template_fails() {
    let mut set = TreeSet::new();
    parse_into(&mut set, "t", "first").expect("first parse");
    let err = parse_into(&mut set, "t", "second").unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::MultipleDefinition {
            name: "t".to_string()
        }
    );
    assert!(err.is_syntax());
    assert!(
        err.to_string()
            .contains("multiple definition of template \"t\"")
    );
    assert!(set.is_empty());
}

#[test]
fn redefinition_of_empty_template_replaces_it() {
    let mut set = TreeSet::new();
    parse_into(&mut set, "t", "  \n").expect("first parse");
    parse_into(&mut set, "t", "body").expect("second parse");
    assert_eq!(set.len(), 1);
    assert_eq!(node_count(&set, "t"), 1);
    assert_eq!(set.get("t").map(Tree::text), Some("body"));
}

#[test]
fn empty_redefinition_keeps_existing_template() {
    let mut set = TreeSet::new();
    parse_into(&mut set, "t", "body").expect("first parse");
    let kept = Tree::new("t")
        .parse("", &mut set, &ParseOptions::default())
        .expect("second parse");
    assert_eq!(kept.text(), "body");
    assert_eq!(node_count(&set, "t"), 1);
}

#[test]
fn distinct_names_coexist() {
    let mut set = TreeSet::new();
    parse_into(&mut set, "a", "x").expect("parse a");
    parse_into(&mut set, "b", "y").expect("parse b");
    assert_eq!(sorted_names(&set), vec!["a", "b"]);
    assert!(set.contains("a"));
    assert_eq!(set.iter().count(), 2);
    assert_eq!(set.into_inner().len(), 2);
}

// -----------------------------------------------------------
// Errors.
// -----------------------------------------------------------

#[test]
fn parse_error_unexpected_end() {
    let err = parse("t", "end").unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::Unexpected {
            found: "{{end}}".to_string()
        }
    );
    assert_eq!(err.to_string(), "template: t:1: unexpected {{end}}");
}

#[test]
fn parse_error_unexpected_end_after_actions() {
    let err = parse("t", "a\nb\n  end c").unwrap_err();
    assert_eq!(err.line, 3);
}

#[test]
fn parse_error_unexpected_else() {
    let err = parse("t", "else").unwrap_err();
    assert_eq!(err.to_string(), "template: t:1: unexpected {{else}}");
}

#[test]
fn parse_error_from_lexer() {
    let err = parse("page", "ok\n123abc").unwrap_err();
    assert!(err.is_lex());
    assert_eq!(
        err.kind,
        ParseErrorKind::Lex(LexErrorKind::BadNumber("123a".to_string()))
    );
    assert_eq!(err.template, "page");
    assert_eq!(err.to_string(), "template: page:2: bad number syntax: \"123a\"");
}

#[test]
fn parse_error_clears_caller_set() {
    let mut set = TreeSet::new();
    parse_into(&mut set, "good", "x").expect("parse");
    assert!(parse_into(&mut set, "bad", "abc$").is_err());
    assert!(set.is_empty());
}

#[test]
fn parse_error_in_inline_mode() {
    let options = ParseOptions::new().lex_mode(LexMode::Inline);
    let err = parse_with("t", "x\nend", &options).unwrap_err();
    assert_eq!(err.line, 2);
}
