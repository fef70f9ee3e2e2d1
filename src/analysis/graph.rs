//! Lazy call-graph construction.
//!
//! Nodes are created on demand: the first `find` on a call expression
//! resolves the callee and, when that lands on a function definition,
//! expands its body. Expansion installs the node in the definition index
//! *before* walking the body, which is what lets mutual recursion
//! terminate. All nodes live in one arena and are addressed by
//! [`CgNodeId`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tree_sitter::Node;

use super::languages::ParseError;
use super::modules::ModuleCache;
use super::node::NodeKey;
use super::traits::{FileId, FileRef};
use super::walk::{walk, Visitor};

/// Index of a node in the call-graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CgNodeId(pub(crate) usize);

/// One callable target encountered during analysis.
pub struct CgNode {
    /// The file the target lives in. Stubs carry the calling file.
    pub file: FileRef,
    /// The function definition, when resolution succeeded.
    pub func: Option<NodeKey>,
    /// Display name; absent for truly anonymous targets.
    pub name: Option<String>,
    /// Callees, in source order of their call expressions.
    pub neighbors: Vec<CgNodeId>,
}

pub struct CallGraph {
    pub(crate) nodes: Vec<CgNode>,
    /// call-expression → resolved or stub node
    pub(crate) call_index: HashMap<(FileId, NodeKey), CgNodeId>,
    /// function-definition → expanded node
    pub(crate) def_index: HashMap<(FileId, NodeKey), CgNodeId>,
    /// shared stubs for unresolved callees, by name
    pub(crate) unresolved: HashMap<String, CgNodeId>,
    /// import resolutions currently on the stack, against re-export cycles
    pub(crate) importing: HashSet<(FileId, String)>,
    pub(crate) modules: ModuleCache,
}

impl CallGraph {
    pub fn new(modules: ModuleCache) -> Self {
        Self {
            nodes: Vec::new(),
            call_index: HashMap::new(),
            def_index: HashMap::new(),
            unresolved: HashMap::new(),
            importing: HashSet::new(),
            modules,
        }
    }

    pub fn modules(&self) -> &ModuleCache {
        &self.modules
    }

    /// Parse an entry file through the shared module cache.
    pub fn load(&mut self, path: &Path) -> Result<FileRef, ParseError> {
        self.modules.load(path)
    }

    pub fn node(&self, id: CgNodeId) -> &CgNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CgNodeId, &CgNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (CgNodeId(i), n))
    }

    /// Build call-graph nodes for every call expression in `file`.
    pub fn add_file(&mut self, file: &FileRef) {
        let file = file.clone();
        let root = file.module().root();
        let mut walker = EntryWalker {
            graph: self,
            file: &file,
        };
        walk(root, &mut walker);
    }

    /// Resolve one call expression to its call-graph node.
    ///
    /// Idempotent: later calls return the memoized node. Unresolvable
    /// callees degrade to stubs shared per name.
    pub fn find(&mut self, file: &FileRef, call: Node) -> Option<CgNodeId> {
        if !file.is_call_expr(call) {
            return None;
        }
        let fid = file.module().id;
        let call_key = NodeKey::of(call);
        if let Some(&cached) = self.call_index.get(&(fid, call_key)) {
            return Some(cached);
        }

        let id = match self.resolve_call_expr(file, call) {
            None => self.stub_for(file, file.callee_name(call)),
            Some((target_file, def_key)) => {
                let is_import = {
                    let node = target_file.module().node(def_key);
                    target_file.is_import(node)
                };
                if is_import {
                    let resolved = file
                        .callee_name(call)
                        .and_then(|name| self.resolve_import(&target_file, def_key, &name));
                    match resolved {
                        Some((import_file, import_def)) => self.expand(&import_file, import_def),
                        None => self.stub_for(file, file.callee_name(call)),
                    }
                } else {
                    self.expand(&target_file, def_key)
                }
            }
        };

        self.call_index.insert((fid, call_key), id);
        Some(id)
    }

    /// Expand a function definition into a call-graph node, walking its
    /// body for call sites. Runs at most once per definition; the memo
    /// also closes recursion cycles, including mutual recursion across
    /// files.
    pub(crate) fn expand(&mut self, file: &FileRef, def_key: NodeKey) -> CgNodeId {
        let fid = file.module().id;
        if let Some(&cached) = self.def_index.get(&(fid, def_key)) {
            return cached;
        }

        let name = {
            let def = file.module().node(def_key);
            file.name_of_function(def)
        };
        let id = CgNodeId(self.nodes.len());
        self.nodes.push(CgNode {
            file: file.clone(),
            func: Some(def_key),
            name,
            neighbors: Vec::new(),
        });
        // Install before descending so recursive calls see this node.
        self.def_index.insert((fid, def_key), id);

        let body_key = {
            let def = file.module().node(def_key);
            file.body_of_function(def).map(NodeKey::of)
        };
        if let Some(body_key) = body_key {
            let file = file.clone();
            let body = file.module().node(body_key);
            let mut walker = CallSiteWalker {
                graph: self,
                file: &file,
                current: id,
            };
            walk(body, &mut walker);
        }

        id
    }

    /// A stub node for an unresolved callee. Stubs are shared per name
    /// so repeated calls to the same unknown collapse into one vertex.
    fn stub_for(&mut self, file: &FileRef, name: Option<String>) -> CgNodeId {
        if let Some(name) = name {
            if let Some(&existing) = self.unresolved.get(&name) {
                return existing;
            }
            let id = CgNodeId(self.nodes.len());
            self.nodes.push(CgNode {
                file: file.clone(),
                func: None,
                name: Some(name.clone()),
                neighbors: Vec::new(),
            });
            self.unresolved.insert(name, id);
            id
        } else {
            let id = CgNodeId(self.nodes.len());
            self.nodes.push(CgNode {
                file: file.clone(),
                func: None,
                name: None,
                neighbors: Vec::new(),
            });
            id
        }
    }
}

/// Walks a function body collecting call sites into `current`'s
/// neighbor list.
struct CallSiteWalker<'g, 'f> {
    graph: &'g mut CallGraph,
    file: &'f FileRef,
    current: CgNodeId,
}

impl Visitor for CallSiteWalker<'_, '_> {
    fn enter(&mut self, node: Node) -> bool {
        // Functions declared inside the body are their own call-graph
        // nodes, not inline callees of the enclosing function.
        if self.file.is_function_def(node) {
            return false;
        }
        if self.file.is_call_expr(node) {
            if let Some(callee) = self.graph.find(self.file, node) {
                self.graph.nodes[self.current.0].neighbors.push(callee);
            }
        }
        true
    }
}

/// Walks a whole file, forcing `find` on every call expression.
struct EntryWalker<'g, 'f> {
    graph: &'g mut CallGraph,
    file: &'f FileRef,
}

impl Visitor for EntryWalker<'_, '_> {
    fn enter(&mut self, node: Node) -> bool {
        if self.file.is_call_expr(node) {
            self.graph.find(self.file, node);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::dot;
    use crate::analysis::languages::{Lang, ParseOptions};

    fn graph_for(code: &str) -> (CallGraph, FileRef) {
        let mut cache = ModuleCache::new(Lang::Python, ParseOptions::default());
        let file = cache
            .load_source(Path::new("test.py"), code.as_bytes().to_vec())
            .unwrap();
        (CallGraph::new(cache), file)
    }

    fn calls_named(file: &FileRef, name: &str) -> Vec<NodeKey> {
        let module = file.module();
        let mut out = Vec::new();
        let mut stack = vec![module.root()];
        while let Some(node) = stack.pop() {
            if file.is_call_expr(node) && file.callee_name(node).as_deref() == Some(name) {
                out.push(NodeKey::of(node));
            }
            for i in (0..node.named_child_count()).rev() {
                stack.push(node.named_child(i).unwrap());
            }
        }
        out
    }

    fn squeeze(s: &str) -> String {
        s.split_whitespace().collect()
    }

    #[test]
    fn linear_chain() {
        let (mut graph, file) = graph_for(
            r#"
def f():
    return

def foo():
    f()

def baz():
    return foo()
baz()
"#,
        );

        let call = calls_named(&file, "baz")[0];
        let root = {
            let node = file.module().node(call);
            graph.find(&file, node).unwrap()
        };

        let want = r#"
            digraph {
                n1 [label="test:baz"];
                n2 [label="test:foo"];
                n3 [label="test:f"];
                n1 -> n2;
                n2 -> n3;
            }
        "#;
        assert_eq!(squeeze(&dot::render_from(&graph, root)), squeeze(want));
    }

    #[test]
    fn recursion_and_closures() {
        let (mut graph, file) = graph_for(
            r#"
def f():
    g()
    x = f()
    def bar():
        return g()
    f2 = lambda x: x
    bar()
    return f2()

def g():
    f()
"#,
        );

        let call = calls_named(&file, "f")[0];
        let root = {
            let node = file.module().node(call);
            graph.find(&file, node).unwrap()
        };

        let want = r#"
            digraph {
                n1 [label="test:f"];
                n2 [label="test:g"];
                n3 [label="test:bar"];
                n4 [label="test:f2"];
                n1 -> n2;
                n1 -> n1;
                n1 -> n3;
                n1 -> n4;
                n2 -> n1;
                n3 -> n2;
            }
        "#;
        assert_eq!(squeeze(&dot::render_from(&graph, root)), squeeze(want));
    }

    #[test]
    fn class_constructor() {
        let (mut graph, file) = graph_for(
            r#"
class A:
    def __init__(x):
        pass

def foo():
    A()

foo()
"#,
        );

        let call = calls_named(&file, "foo")[0];
        let root = {
            let node = file.module().node(call);
            graph.find(&file, node).unwrap()
        };

        let want = r#"
            digraph {
                n1 [label="test:foo"];
                n2 [label="test:__init__"];
                n1 -> n2;
            }
        "#;
        assert_eq!(squeeze(&dot::render_from(&graph, root)), squeeze(want));
    }

    #[test]
    fn find_is_idempotent() {
        let (mut graph, file) = graph_for("def a():\n    pass\na()\n");

        let call = calls_named(&file, "a")[0];
        let first = {
            let node = file.module().node(call);
            graph.find(&file, node).unwrap()
        };
        let count = graph.len();
        let second = {
            let node = file.module().node(call);
            graph.find(&file, node).unwrap()
        };

        assert_eq!(first, second);
        assert_eq!(graph.len(), count);
    }

    #[test]
    fn expand_runs_once_per_definition() {
        let (mut graph, file) = graph_for(
            r#"
def shared():
    pass

def a():
    shared()

def b():
    shared()

a()
b()
"#,
        );
        graph.add_file(&file);

        let shared: Vec<_> = graph
            .iter()
            .filter(|(_, n)| n.name.as_deref() == Some("shared"))
            .collect();
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn unresolved_callee_shares_one_stub() {
        let (mut graph, file) = graph_for("print('a')\nprint('b')\n");
        graph.add_file(&file);

        let stubs: Vec<_> = graph
            .iter()
            .filter(|(_, n)| n.name.as_deref() == Some("print"))
            .collect();
        assert_eq!(stubs.len(), 1);
        let (_, stub) = &stubs[0];
        assert!(stub.func.is_none());
        assert!(stub.neighbors.is_empty());
    }

    #[test]
    fn dotted_callee_without_target_is_anonymous_stub() {
        let (mut graph, file) = graph_for("a.b()\n");
        let module = file.module();

        let mut call_key = None;
        let mut stack = vec![module.root()];
        while let Some(node) = stack.pop() {
            if file.is_call_expr(node) {
                call_key = Some(NodeKey::of(node));
            }
            for i in 0..node.named_child_count() {
                stack.push(node.named_child(i).unwrap());
            }
        }

        let node = module.node(call_key.unwrap());
        let id = graph.find(&file, node).unwrap();
        let stub = graph.node(id);
        assert!(stub.func.is_none());
        assert!(stub.name.is_none());
    }

    #[test]
    fn aliased_local_binding_resolves() {
        let (mut graph, file) = graph_for(
            r#"
def foo():
    pass
bar = foo
bar()
"#,
        );

        let call = calls_named(&file, "bar")[0];
        let id = {
            let node = file.module().node(call);
            graph.find(&file, node).unwrap()
        };
        assert_eq!(graph.node(id).name.as_deref(), Some("foo"));
    }
}
