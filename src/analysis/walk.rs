//! Generic pre/post-order traversal over named AST nodes.

use tree_sitter::Node;

/// Visitor for [`walk`].
///
/// `enter` runs before a node's children and returns whether to descend
/// into them; `leave` runs after.
pub trait Visitor {
    fn enter(&mut self, node: Node) -> bool;

    fn leave(&mut self, _node: Node) {}
}

/// Walk `node` and its named descendants.
pub fn walk(node: Node, visitor: &mut dyn Visitor) {
    let descend = visitor.enter(node);

    if descend {
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                walk(child, visitor);
            }
        }
    }

    visitor.leave(node);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KindCollector {
        entered: Vec<String>,
        left: Vec<String>,
        skip: &'static str,
    }

    impl Visitor for KindCollector {
        fn enter(&mut self, node: Node) -> bool {
            self.entered.push(node.kind().to_string());
            node.kind() != self.skip
        }

        fn leave(&mut self, node: Node) {
            self.left.push(node.kind().to_string());
        }
    }

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser.set_language(&language).unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn visits_named_nodes_in_order() {
        let tree = parse("x = 1\n");
        let mut collector = KindCollector {
            entered: Vec::new(),
            left: Vec::new(),
            skip: "",
        };
        walk(tree.root_node(), &mut collector);

        assert_eq!(
            collector.entered,
            vec![
                "module",
                "expression_statement",
                "assignment",
                "identifier",
                "integer"
            ]
        );
        // leave fires for every entered node, children first
        assert_eq!(collector.left.last().map(String::as_str), Some("module"));
        assert_eq!(collector.left.len(), collector.entered.len());
    }

    #[test]
    fn enter_false_prunes_children() {
        let tree = parse("def f():\n    g()\n");
        let mut collector = KindCollector {
            entered: Vec::new(),
            left: Vec::new(),
            skip: "function_definition",
        };
        walk(tree.root_node(), &mut collector);

        assert!(collector.entered.contains(&"function_definition".to_string()));
        assert!(!collector.entered.contains(&"call".to_string()));
    }
}
