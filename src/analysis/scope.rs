//! Lexical scope trees.
//!
//! A [`ScopeTree`] is built once per parsed file: a top-down walk of the
//! AST that opens a fresh scope at every scope-introducing node and
//! records each declaration into the scope that is current where the
//! declaration appears. Scopes are arena-allocated and addressed by
//! [`ScopeId`], so the tree owns no references into the parse tree.

use std::collections::HashMap;

use tree_sitter::Node;

use super::node::NodeKey;
use super::traits::{DeclKind, Declaration};

/// Node kinds that introduce a lexical scope.
pub const SCOPE_NODE_KINDS: &[&str] = &[
    "module",
    "function_definition",
    "class_definition",
    "class_declaration",
    "method_definition",
    "function_declaration",
];

pub fn is_scope_node(node: Node) -> bool {
    SCOPE_NODE_KINDS.contains(&node.kind())
}

/// Index of a scope within its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// The symbols declared directly inside one module, function, or class.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Sub-scopes in source order.
    pub children: Vec<ScopeId>,
    /// The node that introduced this scope.
    pub ast_node: NodeKey,
    /// name → the node the name was initialized to.
    pub symbols: HashMap<String, NodeKey>,
    /// Inverse of `symbols`, for naming anonymous functions.
    pub name_of_node: HashMap<NodeKey, String>,
    /// Import statements declared here, keyed by local name.
    pub imports: HashMap<String, NodeKey>,
}

pub struct ScopeTree {
    scopes: Vec<Scope>,
    scope_of_node: HashMap<NodeKey, ScopeId>,
}

impl ScopeTree {
    /// Build the scope tree for `root`, extracting declarations with the
    /// supplied language hook.
    pub fn build(root: Node, declarations: &dyn Fn(Node) -> Vec<Declaration>) -> Self {
        let mut tree = ScopeTree {
            scopes: Vec::new(),
            scope_of_node: HashMap::new(),
        };
        tree.build_into(root, None, declarations);
        tree
    }

    fn build_into(
        &mut self,
        node: Node,
        enclosing: Option<ScopeId>,
        declarations: &dyn Fn(Node) -> Vec<Declaration>,
    ) {
        if let Some(scope) = enclosing {
            for decl in declarations(node) {
                self.declare(scope, decl);
            }
        }

        let mut next = enclosing;
        if is_scope_node(node) {
            let id = self.push_scope(enclosing, NodeKey::of(node));
            self.scope_of_node.insert(NodeKey::of(node), id);
            next = Some(id);
        }

        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                self.build_into(child, next, declarations);
            }
        }
    }

    fn push_scope(&mut self, parent: Option<ScopeId>, ast_node: NodeKey) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            children: Vec::new(),
            ast_node,
            symbols: HashMap::new(),
            name_of_node: HashMap::new(),
            imports: HashMap::new(),
        });
        if let Some(parent) = parent {
            self.scopes[parent.0 as usize].children.push(id);
        }
        id
    }

    /// First writer wins: the declaration of a name beats later
    /// assignments to it, which downstream resolution depends on.
    fn declare(&mut self, scope: ScopeId, decl: Declaration) {
        let s = &mut self.scopes[scope.0 as usize];
        if s.symbols.contains_key(&decl.name) {
            return;
        }
        s.symbols.insert(decl.name.clone(), decl.node);
        s.name_of_node.insert(decl.node, decl.name.clone());
        if decl.kind == DeclKind::Import {
            s.imports.insert(decl.name, decl.node);
        }
    }

    /// The global scope. The builder always sees the file's root node
    /// first, so it sits at index zero.
    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_of_node(&self, key: NodeKey) -> Option<ScopeId> {
        self.scope_of_node.get(&key).copied()
    }

    /// Find a symbol starting from `from` and walking up the parents.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<NodeKey> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(&node) = scope.symbols.get(name) {
                return Some(node);
            }
            current = scope.parent;
        }
        None
    }

    /// The scope of the nearest enclosing scope-introducing node.
    pub fn nearest(&self, node: Node) -> Option<ScopeId> {
        let mut current = Some(node);
        while let Some(node) = current {
            if is_scope_node(node) {
                return self.scope_of_node(NodeKey::of(node));
            }
            current = node.parent();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, s)| (ScopeId(i as u32), s))
    }
}
