use anyhow::Result;
use std::path::Path;
use tree_sitter::{Node as TSNode, Parser, Tree};

use crate::error::StubError;

pub struct TreeSitterParser {
    parser: Parser,
}

impl TreeSitterParser {
    pub fn python() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_python::language())
            .map_err(StubError::from)?;
        Ok(Self { parser })
    }

    /// Parse `source`, rejecting trees that contain syntax errors.
    pub fn parse_source(&mut self, module_name: &str, path: &Path, source: &str) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse file: {}", path.display()))?;

        if let Some(error) = first_error(tree.root_node()) {
            let position = error.start_position();
            return Err(StubError::Syntax {
                name: module_name.to_string(),
                path: path.to_path_buf(),
                line: position.row + 1,
                column: position.column + 1,
            }
            .into());
        }

        Ok(tree)
    }
}

/// Depth-first search for the first `ERROR` or missing node.
pub fn first_error(node: TSNode) -> Option<TSNode> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<TSNode> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(first_error)
        .or(Some(node))
}

pub fn extract_text<'a>(node: &TSNode, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.byte_range()]).unwrap_or("")
}

/// Source text with every run of whitespace collapsed to one space.
pub fn normalized_text(node: &TSNode, source: &[u8]) -> String {
    extract_text(node, source)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn named_children<'a>(node: &TSNode<'a>) -> Vec<TSNode<'a>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

pub fn is_identifier(node: &TSNode) -> bool {
    matches!(node.kind(), "identifier" | "keyword_identifier")
}
