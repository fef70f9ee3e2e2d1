//! Language-specific source-file implementations.

mod python;

pub use python::{find_venv_site_packages, PythonFile};

use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use super::traits::{FileId, FileRef};

/// Errors producing a parsed file.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("tree-sitter grammar mismatch: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    #[error("failed to parse {}", .0.display())]
    Syntax(PathBuf),
    #[error("language not supported: {0}")]
    UnsupportedLanguage(String),
}

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Python,
}

impl Lang {
    /// Parse a CLI language tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "py" | "python" => Some(Lang::Python),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Python => "python",
        }
    }

    /// Source-file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Lang::Python => "py",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-parse configuration shared by every file of a run.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Overrides per-file project-root discovery when set.
    pub project_root: Option<PathBuf>,
    /// Virtualenv site-packages directory, discovered at startup.
    pub site_packages: Option<PathBuf>,
}

/// Parse one file from disk.
pub(crate) fn parse_file(
    lang: Lang,
    id: FileId,
    path: &Path,
    options: &ParseOptions,
) -> Result<FileRef, ParseError> {
    let source = std::fs::read(path).map_err(|e| ParseError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_source(lang, id, path, source, options)
}

/// Parse a file whose contents are already in memory.
pub(crate) fn parse_source(
    lang: Lang,
    id: FileId,
    path: &Path,
    source: Vec<u8>,
    options: &ParseOptions,
) -> Result<FileRef, ParseError> {
    match lang {
        Lang::Python => Ok(Rc::new(PythonFile::parse(id, path, source, options)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_tags() {
        assert_eq!(Lang::from_tag("py"), Some(Lang::Python));
        assert_eq!(Lang::from_tag("python"), Some(Lang::Python));
        assert_eq!(Lang::from_tag("haskell"), None);
        assert_eq!(Lang::Python.extension(), "py");
    }
}
