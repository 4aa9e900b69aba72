//! Turns one opened repository into a [`Directory`].
//!
//! The walk yields commits; every (commit, file) pair becomes a
//! [`CommitChangeRecord`] that is folded into per-file totals. Records
//! without a path carry no content delta and are dropped before folding,
//! as are records whose basename matches the ignore filter.

use crate::config::ScanConfig;
use crate::error::{Result, WorkedonError};
use crate::git::{History, SyncOutcome, Synchronizer};
use crate::model::{CommitChange, CommitChangeRecord, Directory, File, PendingDirectory};
use crate::util::{basename, uniq};
use chrono::Utc;
use std::collections::HashMap;

/// Synchronizes (if asked to), walks the history inside the window and
/// aggregates it.
///
/// A failed synchronization only costs freshness: it is logged and the
/// existing local history is used. Failing to read history is returned as
/// [`WorkedonError::Analysis`].
pub fn analyze<H, S>(pending: PendingDirectory<H>, config: &ScanConfig, sync: &S) -> Result<Directory>
where
    H: History,
    S: Synchronizer<H> + ?Sized,
{
    let PendingDirectory { path, mut handle } = pending;

    if config.synchronize {
        match sync.synchronize(&mut handle) {
            Ok(SyncOutcome::Updated) => tracing::debug!("{}: pulled new commits", path.display()),
            Ok(SyncOutcome::UpToDate) => {}
            Err(e) => tracing::warn!("pulling repo {}: {e}", path.display()),
        }
    }

    let cutoff = config
        .window
        .cutoff(Utc::now())
        .map_err(|e| WorkedonError::analysis(&path, e))?;

    let commits = handle
        .changes_since(cutoff, config.author.as_deref())
        .map_err(|e| WorkedonError::analysis(&path, e))?;

    let mut fold = FileFold::new(config.ignore_filename.as_deref());
    for commit in commits {
        let commit = commit.map_err(|e| WorkedonError::analysis(&path, e))?;
        fold.add_commit(&commit);
    }

    let directory = fold.finish(path);
    tracing::debug!(
        "{}: {} changes in {} files",
        directory.path.display(),
        directory.changes,
        directory.files.len()
    );
    Ok(directory)
}

/// Accumulates records into files, keeping files in first-touch order.
pub struct FileFold<'a> {
    ignore: Option<&'a str>,
    files: Vec<File>,
    index: HashMap<String, usize>,
    authors: Vec<String>,
}

impl<'a> FileFold<'a> {
    pub fn new(ignore: Option<&'a str>) -> Self {
        Self {
            ignore,
            files: Vec::new(),
            index: HashMap::new(),
            authors: Vec::new(),
        }
    }

    pub fn add_commit(&mut self, commit: &CommitChange) {
        for record in commit.records() {
            self.add(record);
        }
    }

    pub fn add(&mut self, record: CommitChangeRecord<'_>) {
        if record.file.is_empty() {
            return;
        }
        if let Some(ignore) = self.ignore {
            if basename(record.file) == ignore {
                return;
            }
        }

        let slot = match self.index.get(record.file) {
            Some(&slot) => slot,
            None => {
                self.files.push(File::new(record.file));
                self.index.insert(record.file.to_string(), self.files.len() - 1);
                self.files.len() - 1
            }
        };
        let file = &mut self.files[slot];
        file.changes += record.changes();
        file.authors.push(record.author.to_string());
        self.authors.push(record.author.to_string());
    }

    /// Deduplicates authors and totals everything up into a directory.
    pub fn finish(self, path: impl Into<std::path::PathBuf>) -> Directory {
        let mut directory = Directory::new(path);
        for mut file in self.files {
            file.authors = uniq(&file.authors);
            directory.changes += file.changes;
            directory.files.push(file);
        }
        directory.authors = uniq(&self.authors);
        directory
    }
}
