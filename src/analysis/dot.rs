//! DOT rendering of call graphs.
//!
//! One vertex per call-graph node, labeled `<file-stem>:<function>`;
//! unresolved callees render as `(unresolved):<name>`. Vertex handles
//! (`n1`, `n2`, …) are assigned in first-visit order, so output is
//! stable for a fixed entry point.

use std::collections::HashMap;
use std::fmt::Write;

use super::graph::{CallGraph, CgNodeId};

/// Render every node in the graph.
pub fn render(graph: &CallGraph) -> String {
    let mut printer = Printer::new(graph);
    for (id, _) in graph.iter() {
        printer.visit(id);
    }
    printer.finish()
}

/// Render only the nodes reachable from `root`.
pub fn render_from(graph: &CallGraph, root: CgNodeId) -> String {
    let mut printer = Printer::new(graph);
    printer.visit(root);
    printer.finish()
}

struct Printer<'g> {
    graph: &'g CallGraph,
    order: Vec<CgNodeId>,
    handles: HashMap<CgNodeId, usize>,
}

impl<'g> Printer<'g> {
    fn new(graph: &'g CallGraph) -> Self {
        Self {
            graph,
            order: Vec::new(),
            handles: HashMap::new(),
        }
    }

    fn visit(&mut self, id: CgNodeId) {
        if self.handles.contains_key(&id) {
            return;
        }
        self.handles.insert(id, self.order.len() + 1);
        self.order.push(id);
        for &neighbor in &self.graph.node(id).neighbors {
            self.visit(neighbor);
        }
    }

    fn finish(self) -> String {
        let mut out = String::from("digraph {\n");
        for &id in &self.order {
            let _ = writeln!(
                out,
                "  n{} [label={:?}];",
                self.handles[&id],
                label(self.graph, id)
            );
        }
        for &id in &self.order {
            let from = self.handles[&id];
            for &neighbor in &self.graph.node(id).neighbors {
                let _ = writeln!(out, "  n{} -> n{};", from, self.handles[&neighbor]);
            }
        }
        out.push_str("}\n");
        out
    }
}

fn label(graph: &CallGraph, id: CgNodeId) -> String {
    let node = graph.node(id);
    let stem = node
        .file
        .module()
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match (&node.func, &node.name) {
        (Some(_), Some(name)) => format!("{stem}:{name}"),
        // no body found, so we do not know which module it comes from
        (None, Some(name)) => format!("(unresolved):{name}"),
        (_, None) => format!("{stem}:(unresolved)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::{Lang, ParseOptions};
    use crate::analysis::modules::ModuleCache;
    use std::path::Path;

    #[test]
    fn stubs_render_as_unresolved() {
        let mut cache = ModuleCache::new(Lang::Python, ParseOptions::default());
        let file = cache
            .load_source(Path::new("test.py"), b"def f():\n    missing()\nf()\n".to_vec())
            .unwrap();
        let mut graph = CallGraph::new(cache);
        graph.add_file(&file);

        let rendered = render(&graph);
        assert!(rendered.contains("digraph {"));
        assert!(rendered.contains(r#"[label="test:f"]"#));
        assert!(rendered.contains(r#"[label="(unresolved):missing"]"#));
    }
}
