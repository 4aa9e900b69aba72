use super::{CommitChanges, History, RepositoryProvider};
use crate::error::{Result, WorkedonError};
use crate::model::{CommitChange, FileChange};
use chrono::{DateTime, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{ObjectId, Repository};
use similar::{ChangeTag, TextDiff};
use std::collections::{BinaryHeap, HashSet};
use std::path::{Path, PathBuf};

/// Bytes inspected when deciding whether a blob is binary.
const BINARY_PROBE_LEN: usize = 8000;

/// Opens paths with gix, without searching parent directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitProvider;

impl RepositoryProvider for GitProvider {
    type Handle = GitRepo;

    fn open(&self, path: &Path) -> Result<GitRepo> {
        GitRepo::open(path)
    }
}

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let repo = gix::open(&path).map_err(|e| WorkedonError::open(&path, e))?;
        Ok(Self { repo, path })
    }

    /// The path the repository was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Work tree root, or `None` for a bare repository.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Re-reads the repository from disk after something outside gix changed it.
    pub fn reload(&mut self) -> Result<()> {
        self.repo = gix::open(&self.path).map_err(|e| WorkedonError::open(&self.path, e))?;
        Ok(())
    }

    fn commit_seconds(&self, id: ObjectId) -> Result<i64> {
        Ok(self.repo.find_commit(id)?.time()?.seconds)
    }

    fn commit_change(&self, id: ObjectId) -> Result<CommitChange> {
        let commit = self.repo.find_commit(id)?;
        let author = commit.author()?.name.to_string();
        let commit_tree = commit.tree()?;

        let parent_tree = match commit.parent_ids().next() {
            Some(parent_id) => Some(self.repo.find_commit(parent_id.detach())?.tree()?),
            None => None,
        };

        let changes: Vec<ChangeDetached> =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)?;

        let mut files = Vec::new();
        for change in changes {
            self.handle_change(change, &mut files)?;
        }

        Ok(CommitChange::new(author, files))
    }

    fn handle_change(&self, change: ChangeDetached, files: &mut Vec<FileChange>) -> Result<()> {
        match change {
            ChangeDetached::Addition {
                id,
                location,
                entry_mode,
                ..
            } => {
                if !entry_mode.is_blob() {
                    return Ok(());
                }
                let new = self.find_blob_data(id)?;
                if is_binary(&new) {
                    return Ok(());
                }
                let (added, deleted) = line_stats(&[], &new);
                files.push(FileChange::new(location.to_string(), added, deleted));
            }
            ChangeDetached::Deletion {
                id,
                location,
                entry_mode,
                ..
            } => {
                if !entry_mode.is_blob() {
                    return Ok(());
                }
                let old = self.find_blob_data(id)?;
                if is_binary(&old) {
                    return Ok(());
                }
                let (added, deleted) = line_stats(&old, &[]);
                files.push(FileChange::new(location.to_string(), added, deleted));
            }
            ChangeDetached::Modification {
                previous_id,
                id,
                location,
                entry_mode,
                ..
            } => {
                if !entry_mode.is_blob() {
                    return Ok(());
                }
                let old = self.find_blob_data(previous_id)?;
                let new = self.find_blob_data(id)?;
                if is_binary(&old) || is_binary(&new) {
                    return Ok(());
                }
                let (added, deleted) = line_stats(&old, &new);
                files.push(FileChange::new(location.to_string(), added, deleted));
            }
            ChangeDetached::Rewrite {
                source_id,
                id,
                location,
                entry_mode,
                ..
            } => {
                if !entry_mode.is_blob() {
                    return Ok(());
                }
                // Nothing to attribute when only the path moved.
                if source_id == id {
                    files.push(FileChange::new(String::new(), 0, 0));
                    return Ok(());
                }
                let old = self.find_blob_data(source_id)?;
                let new = self.find_blob_data(id)?;
                if is_binary(&old) || is_binary(&new) {
                    return Ok(());
                }
                let (added, deleted) = line_stats(&old, &new);
                files.push(FileChange::new(location.to_string(), added, deleted));
            }
        }
        Ok(())
    }

    fn find_blob_data(&self, id: ObjectId) -> Result<Vec<u8>> {
        let object = self.repo.find_object(id)?;
        Ok(object.data.clone())
    }
}

impl History for GitRepo {
    fn changes_since<'a>(
        &'a self,
        cutoff: DateTime<Utc>,
        author: Option<&'a str>,
    ) -> Result<CommitChanges<'a>> {
        let mut head = self.repo.head()?;
        if head.is_unborn() {
            return Ok(Box::new(std::iter::empty()));
        }
        let head_commit = head.peel_to_commit_in_place()?;
        let head_id = head_commit.id;

        let mut walk = CommitWalk {
            repo: self,
            cutoff: cutoff.timestamp(),
            author,
            queue: BinaryHeap::new(),
            seen: HashSet::new(),
            done: false,
        };
        walk.enqueue(head_id)?;
        Ok(Box::new(walk))
    }
}

/// Newest-first walk over every commit reachable from HEAD, yielding the ones
/// committed at or after the cutoff.
struct CommitWalk<'a> {
    repo: &'a GitRepo,
    cutoff: i64,
    author: Option<&'a str>,
    queue: BinaryHeap<(i64, ObjectId)>,
    seen: HashSet<ObjectId>,
    done: bool,
}

impl CommitWalk<'_> {
    fn enqueue(&mut self, id: ObjectId) -> Result<()> {
        if self.seen.insert(id) {
            let seconds = self.repo.commit_seconds(id)?;
            self.queue.push((seconds, id));
        }
        Ok(())
    }

    fn step(&mut self) -> Result<Option<CommitChange>> {
        loop {
            let Some((seconds, id)) = self.queue.pop() else {
                return Ok(None);
            };

            let commit = self.repo.repo.find_commit(id)?;
            let parents: Vec<ObjectId> = commit.parent_ids().map(|pid| pid.detach()).collect();
            for pid in parents {
                self.enqueue(pid)?;
            }

            // Committer dates are not monotonic; an old commit can still
            // have ancestors inside the window.
            if seconds < self.cutoff {
                continue;
            }

            if let Some(wanted) = self.author {
                if commit.author()?.name != wanted {
                    continue;
                }
            }

            return self.repo.commit_change(id).map(Some);
        }
    }
}

impl Iterator for CommitWalk<'_> {
    type Item = Result<CommitChange>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(change)) => Some(Ok(change)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn is_binary(data: &[u8]) -> bool {
    data.iter().take(BINARY_PROBE_LEN).any(|&b| b == 0)
}

/// Added and deleted line counts between two blob contents.
pub fn line_stats(old: &[u8], new: &[u8]) -> (u64, u64) {
    let old = String::from_utf8_lossy(old);
    let new = String::from_utf8_lossy(new);
    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());

    let mut added = 0u64;
    let mut deleted = 0u64;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Equal => {}
        }
    }
    (added, deleted)
}
