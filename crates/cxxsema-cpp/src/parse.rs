use cxxsema_error::{Error, ErrorKind, Result};
use tree_sitter::{Node, Parser, Tree};

/// Parse C++ source with the tree-sitter-cpp grammar.
///
/// Syntax errors do not fail the parse; the tree keeps `ERROR` nodes and
/// the collector skips what it cannot understand.
pub fn parse(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_cpp::LANGUAGE.into())
        .map_err(|err| {
            Error::new(ErrorKind::ParseFailed, err.to_string())
                .with_operation("cpp::parse")
                .set_source(err)
        })?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::parse_failed("tree-sitter returned no tree").with_operation("cpp::parse"))?;
    if tree.root_node().has_error() {
        tracing::warn!("source contains syntax errors, affected declarations are skipped");
    }
    Ok(tree)
}

/// Source text covered by `node`.
pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Named children of `node`, skipping comments.
pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// All children of `node` attached to `field`.
pub(crate) fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_source() {
        let tree = parse("int main() { int x; return *&x; }").unwrap();
        let root = tree.root_node();
        assert_eq!(root.kind(), "translation_unit");
        assert!(!root.has_error());
    }

    #[test]
    fn keeps_partial_tree_on_syntax_error() {
        let tree = parse("int main( { ").unwrap();
        assert!(tree.root_node().has_error());
    }

    #[test]
    fn node_text_slices_source() {
        let source = "int value;";
        let tree = parse(source).unwrap();
        let decl = tree.root_node().named_child(0).unwrap();
        assert_eq!(node_text(decl, source), "int value;");
        assert_eq!(field_children(decl, "declarator").len(), 1);
    }
}
