//! Vulnerability scanning of lockfiles.
//!
//! Turns a lockfile into the vulnerable set the reachability engine
//! consumes: package name → (advisory id, summary). Lockfile parsing is
//! local; advisory lookups go to OSV.dev with bounded concurrency.

mod lockfile;
mod osv;

pub use lockfile::{parse_lockfile, PinnedPackage};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while scanning a lockfile.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("could not read lockfile {}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to start async runtime")]
    Runtime(#[source] std::io::Error),
    #[error("advisory service unavailable: 0 of {0} packages checked")]
    Unavailable(usize),
}

/// A vulnerable dependency: the first advisory reported for a package.
#[derive(Debug, Clone)]
pub struct VulnPackage {
    pub package: String,
    /// Primary advisory identifier (e.g. a GHSA or CVE id).
    pub id: String,
    pub summary: String,
}

/// Scan `lockfile` and return the vulnerable set.
///
/// Individual advisory lookups that fail are reported on stderr and
/// treated as not vulnerable. When the lockfile had packages but none
/// could be checked at all, the scan fails instead of passing an empty
/// result off as "all clear".
pub fn scan(lockfile: &Path) -> Result<HashMap<String, VulnPackage>, ScanError> {
    let packages = dedup_by_name(lockfile::parse_lockfile(lockfile)?);
    if packages.is_empty() {
        return Ok(HashMap::new());
    }

    let runtime = tokio::runtime::Runtime::new().map_err(ScanError::Runtime)?;
    let findings = runtime.block_on(osv::query_all(&packages));

    let mut vulnerable = HashMap::new();
    let mut checked = 0;
    for (package, result) in findings {
        match result {
            Ok(Some(vuln)) => {
                checked += 1;
                vulnerable.insert(vuln.package.clone(), vuln);
            }
            Ok(None) => checked += 1,
            Err(e) => {
                eprintln!("warning: could not check {package}: {e}");
            }
        }
    }

    if checked == 0 {
        return Err(ScanError::Unavailable(packages.len()));
    }
    Ok(vulnerable)
}

/// Per-run query map: one advisory lookup per distinct package name,
/// however often the lockfile pins it.
fn dedup_by_name(packages: Vec<PinnedPackage>) -> Vec<PinnedPackage> {
    let mut seen = HashSet::new();
    packages
        .into_iter()
        .filter(|package| seen.insert(package.name.clone()))
        .collect()
}
