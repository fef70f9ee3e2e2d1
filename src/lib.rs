//! Reachcheck - reachability analysis for vulnerable dependencies.
//!
//! A lockfile scanner tells you which dependencies carry known
//! vulnerabilities; reachcheck tells you whether your code can actually
//! reach them. It builds a lazy inter-procedural call graph over
//! tree-sitter parse trees and walks it from your entry points, emitting
//! one report per vulnerable package with the full call path.
//!
//! # Architecture
//!
//! - `analysis`: the reachability engine - scope trees, name resolution,
//!   module cache, lazy call-graph construction, DOT export
//! - `scanner`: lockfile parsing and OSV.dev advisory lookups
//! - `report`: colored terminal output for hits
//! - `cli`: argument parsing and the analysis driver
//!
//! # Adding a New Language
//!
//! Implement the `SourceFile` trait in `src/analysis/languages/` and add
//! a `Lang` variant; see `languages/python.rs` for the reference
//! implementation.

pub mod analysis;
pub mod cli;
pub mod report;
pub mod scanner;

pub use analysis::{
    find_reachable, CallGraph, CgNode, CgNodeId, FileRef, Hit, HitFrame, Lang, ModuleCache,
    ParseError, ParseOptions, SourceFile,
};
pub use scanner::{ScanError, VulnPackage};
