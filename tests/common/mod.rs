#![allow(dead_code)]

use tmpl_parse::{Token, TokenKind, TreeSet, tokenize};

pub fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
        .expect("tokenize failed")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

pub fn values(input: &str) -> Vec<String> {
    tokenize(input)
        .expect("tokenize failed")
        .into_iter()
        .map(|t| t.value)
        .collect()
}

/// Concatenate token values back into source text.
pub fn rejoin(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.value.as_str()).collect()
}

pub fn sorted_names(set: &TreeSet) -> Vec<String> {
    let mut names: Vec<String> = set.names().map(str::to_string).collect();
    names.sort();
    names
}

/// Number of top-level nodes in the named template.
pub fn node_count(set: &TreeSet, name: &str) -> usize {
    set.get(name)
        .and_then(|tree| tree.root())
        .map_or(0, |root| root.nodes().len())
}
