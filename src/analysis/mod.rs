//! Call-graph reachability engine.
//!
//! The engine answers one question lazily: starting from an entry file,
//! which functions does the code actually call, across module
//! boundaries? It is built from a few small layers:
//!
//! ```text
//! ┌──────────────┐    ┌─────────────┐    ┌──────────────┐
//! │ SourceFile   │───▶│ ScopeTree   │───▶│ Resolver     │
//! │ (per lang)   │    │ (per file)  │    │ (names→defs) │
//! └──────────────┘    └─────────────┘    └──────┬───────┘
//!         ▲                                     │
//!         │          ┌─────────────┐    ┌───────▼──────┐
//!         └──────────│ ModuleCache │◀───│ CallGraph    │
//!                    │ (parse once)│    │ (find/expand)│
//!                    └─────────────┘    └──────────────┘
//! ```
//!
//! Everything is best-effort: a callee that cannot be resolved becomes a
//! named stub instead of an error, and files that fail to parse simply
//! leave their imports unresolved.

mod dot;
mod graph;
mod languages;
mod modules;
mod node;
mod reach;
mod resolve;
mod scope;
mod traits;
mod walk;

pub use dot::{render as render_dot, render_from as render_dot_from};
pub use graph::{CallGraph, CgNode, CgNodeId};
pub use languages::{
    find_venv_site_packages, Lang, ParseError, ParseOptions, PythonFile,
};
pub use modules::ModuleCache;
pub use node::NodeKey;
pub use reach::{find_reachable, Hit, HitFrame};
pub use scope::{Scope, ScopeId, ScopeTree, SCOPE_NODE_KINDS};
pub use traits::{DeclKind, Declaration, FileId, FileRef, Module, SourceFile};
pub use walk::{walk, Visitor};
