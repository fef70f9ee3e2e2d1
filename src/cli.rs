//! Command-line interface for reachcheck.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::analysis::{
    self, find_reachable, find_venv_site_packages, CallGraph, Lang, ModuleCache, ParseOptions,
};
use crate::report;
use crate::scanner;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Check whether your code actually reaches its vulnerable dependencies.
///
/// Reachcheck scans a lockfile for known-vulnerable packages, then builds
/// a call graph from the given entry files to see which of those packages
/// your code can actually call. Each reachable vulnerability is reported
/// with the full call path leading to it.
#[derive(Parser)]
#[command(name = "reachcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source language of the entry files (py|python)
    #[arg(short, long)]
    pub language: String,

    /// Path to the dependency lockfile
    #[arg(long)]
    pub lockfile: PathBuf,

    /// Override per-file project-root discovery
    #[arg(long = "repo-root")]
    pub repo_root: Option<PathBuf>,

    /// Print the call graph in DOT format instead of reporting
    #[arg(long)]
    pub dotgraph: bool,

    /// Entry source files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Run an analysis. Returns the process exit code.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let lang = Lang::from_tag(&cli.language)
        .ok_or_else(|| anyhow::anyhow!("language not supported: {}", cli.language))?;

    // A DOT-only run never consults the advisory database.
    let mut vulnerable = if cli.dotgraph {
        HashMap::new()
    } else {
        scanner::scan(&cli.lockfile).context("vulnerability scan failed")?
    };

    let code_path = env::var("CODE_PATH")
        .map(PathBuf::from)
        .or_else(|_| env::current_dir())
        .unwrap_or_else(|_| PathBuf::from("."));
    let site_packages = find_venv_site_packages(&code_path);

    let options = ParseOptions {
        project_root: cli.repo_root.clone(),
        site_packages,
    };
    let mut graph = CallGraph::new(ModuleCache::new(lang, options));

    let mut entries = Vec::new();
    for path in &cli.files {
        let file = graph
            .load(path)
            .with_context(|| format!("failed to analyze {}", path.display()))?;
        graph.add_file(&file);
        entries.push(file.module().path.clone());
    }

    if cli.dotgraph {
        print!("{}", analysis::render_dot(&graph));
        return Ok(EXIT_SUCCESS);
    }

    let mut total_hits = 0;
    for entry in &entries {
        let hits = find_reachable(&graph, entry, &mut vulnerable);
        for hit in &hits {
            report::write_hit(hit);
        }
        total_hits += hits.len();
    }

    if total_hits == 0 {
        report::write_all_clear();
    }

    Ok(EXIT_SUCCESS)
}
