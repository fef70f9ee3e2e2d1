//! The per-language source-file facade.
//!
//! A [`SourceFile`] wraps one parsed file and answers the shape questions
//! the resolver and call-graph engine ask: is this node a call, what is
//! its callee, which file does this import point at, and so on. The
//! language-neutral parts (path, source buffer, tree, scope tree) live in
//! [`Module`]; everything syntactic is behind the trait.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use tree_sitter::{Node, Tree};

use super::languages::Lang;
use super::node::NodeKey;
use super::scope::ScopeTree;

/// Identifies one parsed file within an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub(crate) u32);

/// What kind of binding a declaration introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Assignment,
    Function,
    Class,
    Import,
}

/// A single `name → initializer node` binding discovered in the AST.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub node: NodeKey,
    pub kind: DeclKind,
}

/// The language-neutral half of a parsed file.
pub struct Module {
    pub id: FileId,
    /// Absolute path of the file.
    pub path: PathBuf,
    pub source: Vec<u8>,
    pub tree: Tree,
    pub lang: Lang,
    pub project_root: Option<PathBuf>,
    pub scopes: ScopeTree,
    /// Successful import-statement → file-path resolutions.
    import_paths: RefCell<HashMap<NodeKey, PathBuf>>,
}

impl Module {
    pub fn new(
        id: FileId,
        path: PathBuf,
        source: Vec<u8>,
        tree: Tree,
        lang: Lang,
        project_root: Option<PathBuf>,
        scopes: ScopeTree,
    ) -> Self {
        Self {
            id,
            path,
            source,
            tree,
            lang,
            project_root,
            scopes,
            import_paths: RefCell::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Re-materialize a node from its key.
    ///
    /// Keys are only ever minted from this module's own tree, so a miss
    /// is an internal invariant violation and aborts the analysis.
    pub fn node(&self, key: NodeKey) -> Node<'_> {
        key.resolve(self.root())
            .unwrap_or_else(|| panic!("stale node key {:?} in {}", key, self.path.display()))
    }

    /// Source text of a node.
    pub fn text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    pub(crate) fn cached_import_path(&self, key: NodeKey) -> Option<PathBuf> {
        self.import_paths.borrow().get(&key).cloned()
    }

    pub(crate) fn cache_import_path(&self, key: NodeKey, path: PathBuf) {
        self.import_paths.borrow_mut().insert(key, path);
    }
}

/// Language-specific view over a parsed file.
///
/// Node arguments always come from the same file's tree; implementations
/// may navigate by field name without revalidating that.
pub trait SourceFile {
    fn module(&self) -> &Module;

    /// Bindings introduced by `node`: assignments, function and class
    /// definitions, and imports. Multi-target assignments yield one
    /// declaration per positional target; aliased imports bind the alias.
    fn declarations_of(&self, node: Node) -> Vec<Declaration>;

    fn is_call_expr(&self, node: Node) -> bool;

    /// Includes anonymous functions.
    fn is_function_def(&self, node: Node) -> bool;

    fn is_import(&self, node: Node) -> bool;

    /// Whole-module import, as opposed to a named-item import.
    fn is_module_import(&self, node: Node) -> bool;

    fn is_dotted_expr(&self, node: Node) -> bool;

    /// The callee sub-expression of a call.
    fn callee_of<'t>(&self, call: Node<'t>) -> Option<Node<'t>>;

    /// The callee's name, defined only when the callee is a simple
    /// identifier.
    fn callee_name(&self, call: Node) -> Option<String>;

    fn body_of_function<'t>(&self, func: Node<'t>) -> Option<Node<'t>>;

    /// A nameless function borrows its binding name from the enclosing
    /// scope's inverse map.
    fn name_of_function(&self, func: Node) -> Option<String>;

    fn object_and_property<'t>(&self, dotted: Node<'t>) -> Option<(Node<'t>, Node<'t>)>;

    /// Map an import statement to the file it refers to on disk.
    fn file_path_of_import(&self, import: Node) -> Option<PathBuf>;

    /// Look up a name in this file's global scope.
    fn resolve_exported_symbol(&self, name: &str) -> Option<NodeKey>;

    /// When a name binds to a class definition, pick the constructor
    /// inside the class body.
    fn function_def_from_node<'t>(&self, node: Node<'t>) -> Option<Node<'t>>;

    /// Base name of the project root, when one was located.
    fn package_name(&self) -> Option<String>;
}

/// Shared handle to a parsed file. Files are parsed once per path and
/// referenced from the module cache, call-graph nodes, and resolver
/// frames simultaneously.
pub type FileRef = Rc<dyn SourceFile>;
