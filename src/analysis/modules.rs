//! Per-run module cache.
//!
//! Maps absolute file paths to parsed files. Every path is parsed at most
//! once per analysis run; later requests return the shared handle. The
//! cache also hands out file ids, so node indices can be keyed by
//! `(FileId, NodeKey)` across files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::languages::{self, Lang, ParseError, ParseOptions};
use super::traits::{FileId, FileRef};

pub struct ModuleCache {
    lang: Lang,
    options: ParseOptions,
    files: HashMap<PathBuf, FileRef>,
    next_file_id: u32,
}

impl ModuleCache {
    pub fn new(lang: Lang, options: ParseOptions) -> Self {
        Self {
            lang,
            options,
            files: HashMap::new(),
            next_file_id: 0,
        }
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// Parse-once lookup by path. Reads the file from disk on a miss.
    pub fn load(&mut self, path: &Path) -> Result<FileRef, ParseError> {
        let abs = absolute(path)?;
        if let Some(file) = self.files.get(&abs) {
            return Ok(file.clone());
        }
        let file = languages::parse_file(self.lang, self.next_id(), &abs, &self.options)?;
        self.files.insert(abs, file.clone());
        Ok(file)
    }

    /// Parse-once lookup for a file whose contents are already in memory.
    pub fn load_source(&mut self, path: &Path, source: Vec<u8>) -> Result<FileRef, ParseError> {
        let abs = absolute(path)?;
        if let Some(file) = self.files.get(&abs) {
            return Ok(file.clone());
        }
        let file = languages::parse_source(self.lang, self.next_id(), &abs, source, &self.options)?;
        self.files.insert(abs, file.clone());
        Ok(file)
    }

    pub fn get(&self, path: &Path) -> Option<FileRef> {
        let abs = absolute(path).ok()?;
        self.files.get(&abs).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn next_id(&mut self) -> FileId {
        let id = FileId(self.next_file_id);
        self.next_file_id += 1;
        id
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ParseError> {
    std::path::absolute(path).map_err(|e| ParseError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
