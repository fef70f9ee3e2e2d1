//! Stable handles for tree-sitter nodes.

use tree_sitter::Node;

/// Identifies one AST node within its file.
///
/// tree-sitter nodes borrow the parse tree they came from, so they cannot
/// live inside long-lived maps. A `NodeKey` captures enough to find the
/// node again: the tree-local id plus the byte range. Nodes sharing an
/// identical range form a parent chain, which the id disambiguates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    id: usize,
    start_byte: usize,
    end_byte: usize,
}

impl NodeKey {
    pub fn of(node: Node) -> Self {
        Self {
            id: node.id(),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    pub fn start_byte(&self) -> usize {
        self.start_byte
    }

    pub fn end_byte(&self) -> usize {
        self.end_byte
    }

    /// Find the node this key was taken from, starting at the same tree's
    /// root. Returns `None` when the key belongs to a different tree.
    pub fn resolve<'tree>(&self, root: Node<'tree>) -> Option<Node<'tree>> {
        let mut node = root.descendant_for_byte_range(self.start_byte, self.end_byte)?;
        loop {
            if node.id() == self.id {
                return Some(node);
            }
            match node.parent() {
                Some(parent)
                    if parent.start_byte() == self.start_byte
                        && parent.end_byte() == self.end_byte =>
                {
                    node = parent
                }
                _ => return None,
            }
        }
    }
}
