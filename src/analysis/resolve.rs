//! Name resolution: expressions to definition nodes.
//!
//! The resolver rewrites a `(file, node)` pair until it lands on a
//! function definition or runs out of rules. Identifiers go through the
//! scope chain, dotted expressions through the scope of the resolved
//! object, and imports through the module cache. Failures are normal:
//! the caller degrades them to stub nodes.

use std::collections::HashSet;

use tree_sitter::Node;

use super::graph::CallGraph;
use super::node::NodeKey;
use super::scope::is_scope_node;
use super::traits::{FileId, FileRef};

enum Step {
    Done,
    Dotted,
    Identifier(String),
}

impl CallGraph {
    /// Resolve a call expression to the callee's definition.
    ///
    /// The result is a function definition or an import statement; a
    /// name bound to a class resolves to its constructor. `None` means
    /// the callee could not be pinned down.
    pub(crate) fn resolve_call_expr(
        &mut self,
        file: &FileRef,
        call: Node,
    ) -> Option<(FileRef, NodeKey)> {
        file.module().scopes.nearest(call)?;
        let callee = file.callee_of(call)?;

        let (file, key) = self.resolve_expr(file.clone(), NodeKey::of(callee));

        let ctor = {
            let node = file.module().node(key);
            if file.is_function_def(node) || file.is_import(node) {
                None
            } else {
                Some(file.function_def_from_node(node).map(NodeKey::of))
            }
        };
        match ctor {
            None => Some((file, key)),
            Some(Some(ctor_key)) => Some((file, ctor_key)),
            Some(None) => None,
        }
    }

    /// Closure resolution of an arbitrary expression to the node it was
    /// initialized from.
    pub(crate) fn resolve_expr(&mut self, mut file: FileRef, mut key: NodeKey) -> (FileRef, NodeKey) {
        // Self-referential bindings like `x = x` would otherwise loop.
        let mut seen: HashSet<(FileId, NodeKey)> = HashSet::new();

        loop {
            if !seen.insert((file.module().id, key)) {
                break;
            }

            let step = {
                let module = file.module();
                let node = module.node(key);
                if file.is_function_def(node) {
                    Step::Done
                } else if file.is_dotted_expr(node) {
                    Step::Dotted
                } else if node.kind() == "identifier" {
                    Step::Identifier(module.text(node).to_string())
                } else {
                    Step::Done
                }
            };

            match step {
                Step::Done => break,
                Step::Dotted => match self.resolve_dotted(&file, key) {
                    Some((next_file, next_key)) => {
                        file = next_file;
                        key = next_key;
                    }
                    None => break,
                },
                Step::Identifier(name) => {
                    let Some(init) = self.resolve_identifier(&file, key) else {
                        break;
                    };
                    let init_is_import = {
                        let node = file.module().node(init);
                        file.is_import(node)
                    };
                    if init_is_import {
                        match self.resolve_import(&file, init, &name) {
                            Some((next_file, next_key)) => {
                                file = next_file;
                                key = next_key;
                            }
                            None => break,
                        }
                    } else {
                        key = init;
                    }
                }
            }
        }

        (file, key)
    }

    /// Find the initializer an identifier is bound to, via the scope
    /// chain of its nearest enclosing scope.
    fn resolve_identifier(&self, file: &FileRef, ident_key: NodeKey) -> Option<NodeKey> {
        let module = file.module();
        let ident = module.node(ident_key);
        let scope = module.scopes.nearest(ident)?;
        module.scopes.lookup(scope, module.text(ident))
    }

    /// Resolve `obj.prop`: the object must land on a scope-introducing
    /// node (class or module), and `prop` is looked up in that node's
    /// own scope.
    fn resolve_dotted(&mut self, file: &FileRef, dotted_key: NodeKey) -> Option<(FileRef, NodeKey)> {
        let (object_key, prop_name) = {
            let module = file.module();
            let dotted = module.node(dotted_key);
            let (object, property) = file.object_and_property(dotted)?;
            if property.kind() != "identifier" {
                return None;
            }
            (NodeKey::of(object), module.text(property).to_string())
        };

        let (def_file, def_key) = self.resolve_expr(file.clone(), object_key);

        let decl = {
            let module = def_file.module();
            let def = module.node(def_key);
            if !is_scope_node(def) {
                return None;
            }
            let scope = module.scopes.scope_of_node(def_key)?;
            *module.scopes.get(scope).symbols.get(&prop_name)?
        };

        let decl_is_import = {
            let node = def_file.module().node(decl);
            def_file.is_import(node)
        };
        if decl_is_import {
            self.resolve_import(&def_file, decl, &prop_name)
        } else {
            Some((def_file, decl))
        }
    }

    /// Resolve an import statement to `(file, definition)` for `name`.
    ///
    /// Module imports resolve to the imported file's root; named imports
    /// go through the file's global scope, chasing re-exports. Parse
    /// failures and missing files mean "unresolved", never an error.
    pub(crate) fn resolve_import(
        &mut self,
        file: &FileRef,
        import_key: NodeKey,
        name: &str,
    ) -> Option<(FileRef, NodeKey)> {
        let guard = (file.module().id, name.to_string());
        if !self.importing.insert(guard.clone()) {
            // re-export cycle
            return None;
        }
        let result = self.resolve_import_inner(file, import_key, name);
        self.importing.remove(&guard);
        result
    }

    fn resolve_import_inner(
        &mut self,
        file: &FileRef,
        import_key: NodeKey,
        name: &str,
    ) -> Option<(FileRef, NodeKey)> {
        let path = {
            let import = file.module().node(import_key);
            file.file_path_of_import(import)?
        };
        let imported = self.modules.load(&path).ok()?;

        let is_module_import = {
            let import = file.module().node(import_key);
            file.is_module_import(import)
        };
        if is_module_import {
            let root_key = NodeKey::of(imported.module().root());
            return Some((imported, root_key));
        }

        let def_key = imported.resolve_exported_symbol(name)?;

        let def_is_import = {
            let def = imported.module().node(def_key);
            imported.is_import(def)
        };
        if def_is_import {
            return self.resolve_import(&imported, def_key, name);
        }

        let final_key = {
            let def = imported.module().node(def_key);
            if imported.is_function_def(def) {
                Some(def_key)
            } else {
                imported.function_def_from_node(def).map(NodeKey::of)
            }
        }?;
        Some((imported, final_key))
    }
}
