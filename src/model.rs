use serde::Serialize;
use std::path::{Path, PathBuf};

/// Lines added and deleted in one file by one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path relative to the repository root. Empty when the change has no
    /// content delta to attribute (a pure rename or copy).
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
}

impl FileChange {
    pub fn new(path: impl Into<String>, additions: u64, deletions: u64) -> Self {
        Self {
            path: path.into(),
            additions,
            deletions,
        }
    }
}

/// Everything one commit contributed, as produced by the history walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitChange {
    pub author: String,
    pub files: Vec<FileChange>,
}

impl CommitChange {
    pub fn new(author: impl Into<String>, files: Vec<FileChange>) -> Self {
        Self {
            author: author.into(),
            files,
        }
    }

    /// Flattens the commit into one record per touched file.
    pub fn records(&self) -> impl Iterator<Item = CommitChangeRecord<'_>> + '_ {
        self.files.iter().map(move |change| CommitChangeRecord {
            author: &self.author,
            file: &change.path,
            additions: change.additions,
            deletions: change.deletions,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitChangeRecord<'a> {
    pub author: &'a str,
    pub file: &'a str,
    pub additions: u64,
    pub deletions: u64,
}

impl CommitChangeRecord<'_> {
    pub fn changes(&self) -> u64 {
        self.additions + self.deletions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub path: String,
    pub changes: u64,
    /// Distinct authors in the order they first appear in the walked history.
    pub authors: Vec<String>,
}

impl File {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            changes: 0,
            authors: Vec::new(),
        }
    }
}

/// An analyzed repository. `changes` is always the sum of its files' changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    pub path: PathBuf,
    pub changes: u64,
    pub authors: Vec<String>,
    pub files: Vec<File>,
}

impl Directory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            changes: 0,
            authors: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A repository that opened successfully and is waiting for a worker.
/// The handle belongs to whichever worker picks this up.
#[derive(Debug)]
pub struct PendingDirectory<H> {
    pub path: PathBuf,
    pub handle: H,
}

impl<H> PendingDirectory<H> {
    pub fn new(path: impl Into<PathBuf>, handle: H) -> Self {
        Self {
            path: path.into(),
            handle,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
