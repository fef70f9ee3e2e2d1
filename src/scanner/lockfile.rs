//! Lockfile parsing.
//!
//! Extracts pinned `(package, version)` pairs. `poetry.lock` is
//! recognized by name; anything else is treated as requirements-style
//! (`name==version` per line), which covers `requirements.txt` and
//! `pip freeze` output.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::ScanError;

/// One pinned dependency from a lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedPackage {
    /// Normalized (lowercased) package name.
    pub name: String,
    pub version: String,
}

pub fn parse_lockfile(path: &Path) -> Result<Vec<PinnedPackage>, ScanError> {
    let content =
        fs::read_to_string(path).map_err(|e| ScanError::Io(path.to_path_buf(), e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if file_name == "poetry.lock" {
        Ok(parse_poetry_lock(&content))
    } else {
        Ok(parse_requirements(&content))
    }
}

lazy_static! {
    // name==1.2.3, optionally with extras: name[extra]==1.2.3
    static ref PIN_RE: Regex =
        Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)(?:\[[^\]]*\])?==([^\s;#]+)").unwrap();
}

fn parse_requirements(content: &str) -> Vec<PinnedPackage> {
    let mut packages = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        // comments and pip options (-r, -e, --index-url)
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }

        if let Some(caps) = PIN_RE.captures(line) {
            packages.push(PinnedPackage {
                name: caps[1].to_lowercase(),
                version: caps[2].to_string(),
            });
        }
    }

    packages
}

fn parse_poetry_lock(content: &str) -> Vec<PinnedPackage> {
    let mut packages = Vec::new();
    let mut collecting = false;
    let mut name: Option<String> = None;
    let mut version: Option<String> = None;

    let mut flush = |name: &mut Option<String>, version: &mut Option<String>,
                     packages: &mut Vec<PinnedPackage>| {
        if let (Some(name), Some(version)) = (name.take(), version.take()) {
            packages.push(PinnedPackage { name, version });
        }
    };

    for raw in content.lines() {
        let line = raw.trim();

        if line == "[[package]]" {
            flush(&mut name, &mut version, &mut packages);
            collecting = true;
            continue;
        }

        // a sub-table ([package.dependencies], [metadata], …) ends the
        // stanza header; name/version only count before it
        if line.starts_with('[') {
            flush(&mut name, &mut version, &mut packages);
            collecting = false;
            continue;
        }

        if collecting {
            if let Some(value) = toml_string_value(line, "name") {
                name = Some(value.to_lowercase());
            }
            if let Some(value) = toml_string_value(line, "version") {
                version = Some(value);
            }
        }
    }

    flush(&mut name, &mut version, &mut packages);
    packages
}

/// Parse `key = "value"` from one line.
fn toml_string_value(line: &str, key: &str) -> Option<String> {
    let rest = line.strip_prefix(key)?.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let rest = rest.strip_prefix('"')?;
    Some(rest[..rest.find('"')?].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_pins() {
        let packages = parse_requirements(
            r#"
# comment
requests==2.19.0
Flask==2.0.1
pandas[sql]==1.3.0
numpy>=1.20
-r other-requirements.txt
--index-url https://pypi.org/simple
urllib3==1.24.1 ; python_version >= "3.6"
"#,
        );

        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["requests", "flask", "pandas", "urllib3"]);
        assert_eq!(packages[0].version, "2.19.0");
        assert_eq!(packages[3].version, "1.24.1");
    }

    #[test]
    fn poetry_lock_stanzas() {
        let packages = parse_poetry_lock(
            r#"
[[package]]
name = "requests"
version = "2.19.0"
description = "HTTP for Humans"

[package.dependencies]
urllib3 = ">=1.21.1"

[[package]]
name = "Jinja2"
version = "3.1.0"

[metadata]
lock-version = "2.0"
"#,
        );

        assert_eq!(
            packages,
            vec![
                PinnedPackage {
                    name: "requests".to_string(),
                    version: "2.19.0".to_string()
                },
                PinnedPackage {
                    name: "jinja2".to_string(),
                    version: "3.1.0".to_string()
                },
            ]
        );
    }

    #[test]
    fn toml_value_requires_exact_key() {
        assert_eq!(
            toml_string_value(r#"name = "requests""#, "name"),
            Some("requests".to_string())
        );
        assert_eq!(toml_string_value(r#"namespace = "x""#, "name"), None);
        assert_eq!(toml_string_value("name = 42", "name"), None);
    }
}
