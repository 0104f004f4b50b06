//! Where an asset's source text comes from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// The source of one asset's script text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Read the file's current text on every sync.
    FileBacked(PathBuf),
    /// Fixed text supplied by the caller.
    InMemory(Arc<str>),
}

impl Source {
    /// Returns the current source text.
    pub fn read_text(&self) -> std::io::Result<String> {
        match self {
            Source::FileBacked(path) => std::fs::read_to_string(path),
            Source::InMemory(text) => Ok(text.to_string()),
        }
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::FileBacked(path) => Some(path),
            Source::InMemory(_) => None,
        }
    }

    /// Current modification time of the backing file.
    ///
    /// `None` for in-memory sources and for files whose metadata can't be read.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.path()
            .and_then(|path| atlus_cache::source_modified(path).ok())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::FileBacked(path) => write!(f, "{}", path.display()),
            Source::InMemory(_) => f.write_str("<in-memory>"),
        }
    }
}
