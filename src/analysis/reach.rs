//! Reachability: DFS over the call graph from an entry file's roots.
//!
//! Roots are the call-graph nodes owned by the entry file; the walk
//! descends through neighbors regardless of file, keeping a visited set
//! and the active path. The reporter turns visits into hits against the
//! vulnerable set, one report per vulnerable package per run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::graph::{CallGraph, CgNodeId};
use crate::scanner::VulnPackage;

/// One frame of a hit's call path.
#[derive(Debug, Clone)]
pub struct HitFrame {
    pub function: String,
    /// Relative to the frame's project root when one exists.
    pub file: PathBuf,
    /// Line of the function definition, 1-indexed.
    pub line: usize,
    pub package: Option<String>,
}

/// A reachable vulnerable dependency.
#[derive(Debug, Clone)]
pub struct Hit {
    pub package: String,
    /// The user-reachable function inside the vulnerable package.
    pub function: String,
    /// Call path, root first, hit last. Only named nodes appear.
    pub frames: Vec<HitFrame>,
    pub vuln_id: String,
    pub summary: String,
}

impl CallGraph {
    /// Depth-first walk from every node owned by `entry`, visiting each
    /// node once with the path that first reached it.
    pub fn walk_from<F>(&self, entry: &Path, mut visit: F)
    where
        F: FnMut(CgNodeId, &[CgNodeId]),
    {
        let mut visited: HashSet<CgNodeId> = HashSet::new();
        let mut path: Vec<CgNodeId> = Vec::new();

        for (id, node) in self.iter() {
            if node.file.module().path != entry {
                continue;
            }
            if visited.contains(&id) {
                continue;
            }
            self.walk_node(id, &mut visited, &mut path, &mut visit);
        }
    }

    fn walk_node<F>(
        &self,
        id: CgNodeId,
        visited: &mut HashSet<CgNodeId>,
        path: &mut Vec<CgNodeId>,
        visit: &mut F,
    ) where
        F: FnMut(CgNodeId, &[CgNodeId]),
    {
        visited.insert(id);
        path.push(id);
        visit(id, path);

        for &neighbor in &self.node(id).neighbors {
            if !visited.contains(&neighbor) {
                self.walk_node(neighbor, visited, path, visit);
            }
        }

        path.pop();
    }
}

/// Walk the graph from `entry` and report every reachable function that
/// belongs to a package in `vulnerable`. Each reported package is
/// removed from the set, so it produces at most one hit per run.
pub fn find_reachable(
    graph: &CallGraph,
    entry: &Path,
    vulnerable: &mut HashMap<String, VulnPackage>,
) -> Vec<Hit> {
    let mut hits = Vec::new();

    graph.walk_from(entry, |id, path| {
        let node = graph.node(id);
        let Some(package) = node.file.package_name() else {
            return;
        };
        let Some(vuln) = vulnerable.get(&package) else {
            return;
        };
        let Some(function) = node.name.clone() else {
            return;
        };

        let frames = path
            .iter()
            .filter_map(|&frame_id| frame_of(graph, frame_id))
            .collect();
        hits.push(Hit {
            package: package.clone(),
            function,
            frames,
            vuln_id: vuln.id.clone(),
            summary: vuln.summary.clone(),
        });
        vulnerable.remove(&package);
    });

    hits
}

fn frame_of(graph: &CallGraph, id: CgNodeId) -> Option<HitFrame> {
    let node = graph.node(id);
    let function = node.name.clone()?;
    let module = node.file.module();

    let line = node
        .func
        .map(|key| module.node(key).start_position().row + 1)
        .unwrap_or(0);
    let file = match &module.project_root {
        Some(root) => module
            .path
            .strip_prefix(root)
            .unwrap_or(&module.path)
            .to_path_buf(),
        None => module.path.clone(),
    };

    Some(HitFrame {
        function,
        file,
        line,
        package: node.file.package_name(),
    })
}
