//! Python source-file facade.
//!
//! Navigates tree-sitter-python trees by field name: declarations,
//! imports, call shapes, and the filesystem conventions (project
//! markers, package layout, virtualenvs) that anchor import resolution.

use std::fs;
use std::path::{Path, PathBuf};

use tree_sitter::Node;
use walkdir::WalkDir;

use super::{Lang, ParseError, ParseOptions};
use crate::analysis::node::NodeKey;
use crate::analysis::scope::ScopeTree;
use crate::analysis::traits::{DeclKind, Declaration, FileId, Module, SourceFile};

/// Files that mark a Python project root.
const PROJECT_MARKERS: &[&str] = &["setup.py", "setup.cfg", "pyproject.toml"];

pub struct PythonFile {
    module: Module,
    site_packages: Option<PathBuf>,
}

impl PythonFile {
    pub fn parse(
        id: FileId,
        path: &Path,
        source: Vec<u8>,
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        let path = std::path::absolute(path).map_err(|e| ParseError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let project_root = options
            .project_root
            .clone()
            .or_else(|| find_project_root(&path));

        let mut parser = tree_sitter::Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser.set_language(&language)?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| ParseError::Syntax(path.clone()))?;

        let scopes = ScopeTree::build(tree.root_node(), &|node| declarations(&source, node));

        Ok(Self {
            module: Module::new(id, path, source, tree, Lang::Python, project_root, scopes),
            site_packages: options.site_packages.clone(),
        })
    }
}

fn node_text<'a>(source: &'a [u8], node: Node) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Extract the bindings a node introduces. Shared by the scope builder
/// (which runs before the `PythonFile` exists) and the facade.
fn declarations(source: &[u8], node: Node) -> Vec<Declaration> {
    match node.kind() {
        "assignment" => {
            let (Some(lhs), Some(rhs)) = (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) else {
                return Vec::new();
            };

            if lhs.kind() == "identifier" {
                return vec![Declaration {
                    name: node_text(source, lhs).to_string(),
                    node: NodeKey::of(rhs),
                    kind: DeclKind::Assignment,
                }];
            }

            // a, b = 1, 2 — pair targets with values positionally
            if lhs.kind() == "pattern_list" && rhs.kind() == "expression_list" {
                let count = lhs.named_child_count().min(rhs.named_child_count());
                let mut decls = Vec::new();
                for i in 0..count {
                    let (Some(target), Some(value)) = (lhs.named_child(i), rhs.named_child(i))
                    else {
                        continue;
                    };
                    if target.kind() == "identifier" {
                        decls.push(Declaration {
                            name: node_text(source, target).to_string(),
                            node: NodeKey::of(value),
                            kind: DeclKind::Assignment,
                        });
                    }
                }
                return decls;
            }

            Vec::new()
        }

        "function_definition" => {
            let Some(name) = node.child_by_field_name("name") else {
                return Vec::new();
            };
            vec![Declaration {
                name: node_text(source, name).to_string(),
                node: NodeKey::of(node),
                kind: DeclKind::Function,
            }]
        }

        "class_definition" => {
            let Some(name) = node.child_by_field_name("name") else {
                return Vec::new();
            };
            vec![Declaration {
                name: node_text(source, name).to_string(),
                node: NodeKey::of(node),
                kind: DeclKind::Class,
            }]
        }

        "import_from_statement" => {
            let mut decls = Vec::new();
            let mut cursor = node.walk();
            for imported in node.children_by_field_name("name", &mut cursor) {
                match imported.kind() {
                    "dotted_name" => {
                        if let Some(first) = imported.child(0) {
                            if first.kind() == "identifier" {
                                decls.push(Declaration {
                                    name: node_text(source, first).to_string(),
                                    node: NodeKey::of(node),
                                    kind: DeclKind::Import,
                                });
                            }
                        }
                    }
                    "aliased_import" => {
                        if let Some(alias) = imported.child_by_field_name("alias") {
                            decls.push(Declaration {
                                name: node_text(source, alias).to_string(),
                                node: NodeKey::of(node),
                                kind: DeclKind::Import,
                            });
                        }
                    }
                    // wildcard imports bind nothing resolvable
                    _ => {}
                }
            }
            decls
        }

        "import_statement" => {
            let mut decls = Vec::new();
            let mut cursor = node.walk();
            for imported in node.children_by_field_name("name", &mut cursor) {
                match imported.kind() {
                    "dotted_name" => {
                        let name = node_text(source, imported);
                        // `import a.b` binds a submodule path; unsupported
                        if !name.contains('.') {
                            decls.push(Declaration {
                                name: name.to_string(),
                                node: NodeKey::of(node),
                                kind: DeclKind::Import,
                            });
                        }
                    }
                    "aliased_import" => {
                        if let Some(alias) = imported.child_by_field_name("alias") {
                            decls.push(Declaration {
                                name: node_text(source, alias).to_string(),
                                node: NodeKey::of(node),
                                kind: DeclKind::Import,
                            });
                        }
                    }
                    _ => {}
                }
            }
            decls
        }

        _ => Vec::new(),
    }
}

impl SourceFile for PythonFile {
    fn module(&self) -> &Module {
        &self.module
    }

    fn declarations_of(&self, node: Node) -> Vec<Declaration> {
        declarations(&self.module.source, node)
    }

    fn is_call_expr(&self, node: Node) -> bool {
        node.kind() == "call"
    }

    fn is_function_def(&self, node: Node) -> bool {
        matches!(node.kind(), "function_definition" | "lambda")
    }

    fn is_import(&self, node: Node) -> bool {
        matches!(node.kind(), "import_statement" | "import_from_statement")
    }

    fn is_module_import(&self, node: Node) -> bool {
        node.kind() == "import_statement"
    }

    fn is_dotted_expr(&self, node: Node) -> bool {
        node.kind() == "attribute"
    }

    fn callee_of<'t>(&self, call: Node<'t>) -> Option<Node<'t>> {
        call.child_by_field_name("function")
    }

    fn callee_name(&self, call: Node) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        if function.kind() != "identifier" {
            return None;
        }
        Some(self.module.text(function).to_string())
    }

    fn body_of_function<'t>(&self, func: Node<'t>) -> Option<Node<'t>> {
        if !self.is_function_def(func) {
            return None;
        }
        func.child_by_field_name("body")
    }

    fn name_of_function(&self, func: Node) -> Option<String> {
        match func.kind() {
            "function_definition" => func
                .child_by_field_name("name")
                .map(|n| self.module.text(n).to_string()),
            "lambda" => {
                let scopes = &self.module.scopes;
                let nearest = scopes.nearest(func)?;
                scopes
                    .get(nearest)
                    .name_of_node
                    .get(&NodeKey::of(func))
                    .cloned()
            }
            _ => None,
        }
    }

    fn object_and_property<'t>(&self, dotted: Node<'t>) -> Option<(Node<'t>, Node<'t>)> {
        Some((
            dotted.child_by_field_name("object")?,
            dotted.child_by_field_name("attribute")?,
        ))
    }

    fn file_path_of_import(&self, import: Node) -> Option<PathBuf> {
        let module = &self.module;
        let key = NodeKey::of(import);
        if let Some(cached) = module.cached_import_path(key) {
            return Some(cached);
        }

        let (module_name, item_name) = match import.kind() {
            "import_from_statement" => {
                let name = import.child_by_field_name("module_name")?;
                let item = import
                    .child_by_field_name("name")
                    .map(|n| module.text(n).to_string());
                (module.text(name).to_string(), item)
            }
            "import_statement" => {
                let name = import.child_by_field_name("name")?;
                (module.text(name).to_string(), None)
            }
            _ => return None,
        };

        // Leading dots select how many directories to ascend from here.
        let mut up_levels = 0;
        let mut module_name = module_name.as_str();
        while let Some(rest) = module_name.strip_prefix('.') {
            module_name = rest;
            up_levels += 1;
        }

        let base: PathBuf = module_name.split('.').filter(|s| !s.is_empty()).collect();

        let primary_root = if up_levels > 0 {
            let mut dir = module.path.clone();
            for _ in 0..up_levels {
                dir = dir.parent()?.to_path_buf();
            }
            Some(dir)
        } else {
            module.project_root.clone()
        };

        let mut module_paths = vec![base.clone()];
        if let Some(item) = &item_name {
            // the imported item may itself be a submodule
            module_paths.push(base.join(item));
        }

        let mut roots = Vec::new();
        if let Some(root) = primary_root {
            roots.push(root);
        }
        if let Some(site) = &self.site_packages {
            roots.push(site.clone());
        }

        let ext = Lang::Python.extension();
        for root in &roots {
            for prefix in ["", "src"] {
                for module_path in &module_paths {
                    let stem = if prefix.is_empty() {
                        root.join(module_path)
                    } else {
                        root.join(prefix).join(module_path)
                    };
                    let candidates =
                        [stem.join(format!("__init__.{ext}")), stem.with_extension(ext)];
                    for candidate in candidates {
                        if candidate.is_file() {
                            module.cache_import_path(key, candidate.clone());
                            return Some(candidate);
                        }
                    }
                }
            }
        }

        None
    }

    fn resolve_exported_symbol(&self, name: &str) -> Option<NodeKey> {
        let scopes = &self.module.scopes;
        scopes.get(scopes.global()).symbols.get(name).copied()
    }

    fn function_def_from_node<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if node.kind() != "class_definition" {
            return None;
        }
        let body = node.child_by_field_name("body")?;
        // Reverse search: @overload stacks leave the real __init__ last.
        for i in (0..body.named_child_count()).rev() {
            let Some(child) = body.named_child(i) else {
                continue;
            };
            if child.kind() != "function_definition" {
                continue;
            }
            let Some(name) = child.child_by_field_name("name") else {
                continue;
            };
            if self.module.text(name) == "__init__" {
                return Some(child);
            }
        }
        None
    }

    fn package_name(&self) -> Option<String> {
        self.module
            .project_root
            .as_ref()?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Walk upward from `path` until a directory carries a project marker.
/// A directory sitting directly inside `site-packages` is its own root.
fn find_project_root(path: &Path) -> Option<PathBuf> {
    let abs = std::path::absolute(path).ok()?;
    let mut dir = abs.parent()?.to_path_buf();

    loop {
        for marker in PROJECT_MARKERS {
            if dir.join(marker).is_file() {
                return Some(dir);
            }
        }

        let parent = dir.parent()?.to_path_buf();
        if parent.file_name().is_some_and(|n| n == "site-packages") {
            return Some(dir);
        }
        dir = parent;
    }
}

/// Locate a virtualenv's site-packages under `root`: any immediate
/// subdirectory containing `lib/**/site-packages`.
pub fn find_venv_site_packages(root: &Path) -> Option<PathBuf> {
    let root = std::path::absolute(root).ok()?;
    for entry in fs::read_dir(&root).ok()?.flatten() {
        let lib = entry.path().join("lib");
        if !lib.is_dir() {
            continue;
        }
        for found in WalkDir::new(&lib).into_iter().flatten() {
            if found.file_type().is_dir() && found.file_name() == "site-packages" {
                return Some(found.into_path());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse_str(path: &str, code: &str) -> PythonFile {
        PythonFile::parse(
            FileId(0),
            Path::new(path),
            code.as_bytes().to_vec(),
            &ParseOptions::default(),
        )
        .unwrap()
    }

    const SCOPE_SOURCE: &str = r#"
x = 'x'
def foo():
    def bar():
        baz = 420
        return 1
    return bar()

y, z = 1, 2
a, b: Tuple[int, int] = 1, 2

class Foo:
    def __init__(self):
        pass
"#;

    #[test]
    fn scope_tree_symbols() {
        let py = parse_str("test.py", SCOPE_SOURCE);
        let module = py.module();
        let scopes = &module.scopes;
        let global = scopes.get(scopes.global());

        assert!(global.symbols.contains_key("foo"));
        assert!(global.symbols.contains_key("x"));
        assert_eq!(module.text(module.node(global.symbols["x"])), "'x'");

        assert!(global.symbols.contains_key("Foo"));
        assert_eq!(module.node(global.symbols["Foo"]).kind(), "class_definition");

        // y, z = 1, 2
        assert!(global.symbols.contains_key("y"));
        assert!(global.symbols.contains_key("z"));

        // a, b: Tuple[int, int] = 1, 2
        assert_eq!(module.text(module.node(global.symbols["a"])), "1");
        assert_eq!(module.text(module.node(global.symbols["b"])), "2");

        // bar is local to foo
        assert!(!global.symbols.contains_key("bar"));
        assert_eq!(global.children.len(), 2);
        let foo_scope = scopes.get(global.children[0]);
        assert!(foo_scope.symbols.contains_key("bar"));

        assert_eq!(foo_scope.children.len(), 1);
        let bar_scope = scopes.get(foo_scope.children[0]);
        assert!(bar_scope.symbols.contains_key("baz"));
        assert_eq!(module.text(module.node(bar_scope.symbols["baz"])), "420");
    }

    #[test]
    fn scope_of_node_covers_scope_introducers() {
        let py = parse_str("test.py", SCOPE_SOURCE);
        let scopes = &py.module().scopes;
        for (_, scope) in scopes.iter() {
            let id = scopes.scope_of_node(scope.ast_node);
            assert!(id.is_some());
            assert_eq!(scopes.get(id.unwrap()).ast_node, scope.ast_node);
        }
    }

    #[test]
    fn first_writer_wins() {
        let py = parse_str("test.py", "x = 'first'\nx = 'second'\n");
        let module = py.module();
        let scopes = &module.scopes;
        let global = scopes.get(scopes.global());
        assert_eq!(module.text(module.node(global.symbols["x"])), "'first'");
    }

    #[test]
    fn import_declarations_use_aliases() {
        let py = parse_str(
            "test.py",
            "from pkg.sub import thing\nfrom pkg import other as alias\nimport numpy as np\nimport os\n",
        );
        let module = py.module();
        let scopes = &module.scopes;
        let global = scopes.get(scopes.global());

        for name in ["thing", "alias", "np", "os"] {
            assert!(global.symbols.contains_key(name), "missing {name}");
            assert!(global.imports.contains_key(name), "{name} not an import");
        }
        assert!(!global.symbols.contains_key("other"));
        assert!(!global.symbols.contains_key("numpy"));

        // exports answer from the same table
        assert!(py.resolve_exported_symbol("thing").is_some());
        assert!(py.resolve_exported_symbol("numpy").is_none());
    }

    #[test]
    fn lambda_named_from_binding() {
        let py = parse_str("test.py", "f2 = lambda x: x\n");
        let module = py.module();
        let scopes = &module.scopes;
        let key = scopes.get(scopes.global()).symbols["f2"];
        let lambda = module.node(key);
        assert_eq!(lambda.kind(), "lambda");
        assert_eq!(py.name_of_function(lambda), Some("f2".to_string()));
    }

    #[test]
    fn constructor_picked_in_reverse() {
        let py = parse_str(
            "test.py",
            r#"
class A:
    def helper(self):
        pass
    def __init__(self, x):
        pass
    def __init__(self, x, y):
        pass
"#,
        );
        let module = py.module();
        let class_key = module.scopes.get(module.scopes.global()).symbols["A"];
        let ctor = py.function_def_from_node(module.node(class_key)).unwrap();
        // the later definition wins
        assert!(module.text(ctor).contains("x, y"));
    }

    #[test]
    fn callee_name_only_for_identifiers() {
        let py = parse_str("test.py", "foo()\nobj.method()\n");
        let module = py.module();
        let root = module.root();

        let mut names = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if py.is_call_expr(node) {
                names.push(py.callee_name(node));
            }
            for i in 0..node.named_child_count() {
                stack.push(node.named_child(i).unwrap());
            }
        }
        names.sort();
        assert_eq!(names, vec![None, Some("foo".to_string())]);
    }

    #[test]
    fn project_root_from_marker_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("proj");
        fs::create_dir_all(root.join("src/mypackage")).unwrap();
        fs::write(root.join("pyproject.toml"), "[project]\nname = \"proj\"\n").unwrap();
        let file = root.join("src/mypackage/__main__.py");
        fs::write(&file, "print('hi')\n").unwrap();

        let found = find_project_root(&file).unwrap();
        assert_eq!(found.canonicalize().unwrap(), root.canonicalize().unwrap());
    }

    #[test]
    fn project_root_inside_site_packages() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("venv/lib/site-packages/somelib");
        fs::create_dir_all(&pkg).unwrap();
        let file = pkg.join("core.py");
        fs::write(&file, "x = 1\n").unwrap();

        let found = find_project_root(&file).unwrap();
        assert_eq!(found.canonicalize().unwrap(), pkg.canonicalize().unwrap());
    }

    #[test]
    fn package_name_is_root_base_name() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("victim");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("setup.py"), "").unwrap();
        let file = root.join("app.py");
        fs::write(&file, "x = 1\n").unwrap();

        let py = PythonFile::parse(
            FileId(0),
            &file,
            fs::read(&file).unwrap(),
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(py.package_name(), Some("victim".to_string()));
    }

    #[test]
    fn import_probes_package_before_module_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("proj");
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pyproject.toml"), "").unwrap();
        fs::write(root.join("pkg/__init__.py"), "").unwrap();
        fs::write(root.join("pkg/b.py"), "def b():\n    pass\n").unwrap();
        let entry = root.join("a.py");
        fs::write(&entry, "from pkg.b import b\nb()\n").unwrap();

        let py = PythonFile::parse(
            FileId(0),
            &entry,
            fs::read(&entry).unwrap(),
            &ParseOptions::default(),
        )
        .unwrap();

        let module = py.module();
        let import_key = module.scopes.get(module.scopes.global()).symbols["b"];
        let resolved = py.file_path_of_import(module.node(import_key)).unwrap();
        assert_eq!(
            resolved.canonicalize().unwrap(),
            root.join("pkg/b.py").canonicalize().unwrap()
        );

        // second lookup served from the per-node cache
        let again = py.file_path_of_import(module.node(import_key)).unwrap();
        assert_eq!(again, resolved);
    }

    #[test]
    fn import_probes_src_layout() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("proj");
        fs::create_dir_all(root.join("src/helpers")).unwrap();
        fs::write(root.join("setup.cfg"), "").unwrap();
        fs::write(root.join("src/helpers/__init__.py"), "def go():\n    pass\n").unwrap();
        let entry = root.join("main.py");
        fs::write(&entry, "import helpers\n").unwrap();

        let py = PythonFile::parse(
            FileId(0),
            &entry,
            fs::read(&entry).unwrap(),
            &ParseOptions::default(),
        )
        .unwrap();

        let module = py.module();
        let import_key = module.scopes.get(module.scopes.global()).symbols["helpers"];
        let resolved = py.file_path_of_import(module.node(import_key)).unwrap();
        assert_eq!(
            resolved.canonicalize().unwrap(),
            root.join("src/helpers/__init__.py").canonicalize().unwrap()
        );
    }

    #[test]
    fn relative_import_ascends_by_dot_count() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("proj");
        fs::create_dir_all(root.join("pkg/inner")).unwrap();
        fs::write(root.join("pyproject.toml"), "").unwrap();
        fs::write(root.join("pkg/util.py"), "def helper():\n    pass\n").unwrap();
        let entry = root.join("pkg/inner/deep.py");
        fs::write(&entry, "from ..util import helper\n").unwrap();

        let py = PythonFile::parse(
            FileId(0),
            &entry,
            fs::read(&entry).unwrap(),
            &ParseOptions::default(),
        )
        .unwrap();

        let module = py.module();
        let import_key = module.scopes.get(module.scopes.global()).symbols["helper"];
        let resolved = py.file_path_of_import(module.node(import_key)).unwrap();
        assert_eq!(
            resolved.canonicalize().unwrap(),
            root.join("pkg/util.py").canonicalize().unwrap()
        );
    }

    #[test]
    fn venv_site_packages_discovery() {
        let temp = TempDir::new().unwrap();
        let site = temp.path().join("venv/lib/python3.12/site-packages");
        fs::create_dir_all(&site).unwrap();

        let found = find_venv_site_packages(temp.path()).unwrap();
        assert_eq!(found.canonicalize().unwrap(), site.canonicalize().unwrap());
    }

    #[test]
    fn unresolvable_import_is_none() {
        let py = parse_str("test.py", "import definitely_missing\n");
        let module = py.module();
        let key = module.scopes.get(module.scopes.global()).symbols["definitely_missing"];
        assert!(py.file_path_of_import(module.node(key)).is_none());
    }
}
