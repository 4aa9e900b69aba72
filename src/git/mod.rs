//! Capabilities the scan needs from version control.
//!
//! The pipeline and analyzer only talk to these traits. [`GitProvider`],
//! [`GitRepo`] and [`GitPull`] are the gix and git CLI backed implementations
//! used by the binary; tests plug in in-memory fakes.

pub mod repo;
pub mod sync;

pub use repo::{GitProvider, GitRepo};
pub use sync::{AmbientCredentials, CredentialProvider, GitPull, SshIdentity};

use crate::error::Result;
use crate::model::CommitChange;
use chrono::{DateTime, Utc};
use std::path::Path;

pub type CommitChanges<'a> = Box<dyn Iterator<Item = Result<CommitChange>> + 'a>;

/// Opens candidate paths as repositories.
pub trait RepositoryProvider: Send + Sync + 'static {
    type Handle: History;

    fn open(&self, path: &Path) -> Result<Self::Handle>;
}

/// Read access to one repository's commit history.
pub trait History: Send + 'static {
    /// Lazily yields the commits made at or after `cutoff`, newest first.
    /// With `author` set, commits by anyone else are not yielded at all.
    fn changes_since<'a>(
        &'a self,
        cutoff: DateTime<Utc>,
        author: Option<&'a str>,
    ) -> Result<CommitChanges<'a>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New commits were brought in from the remote.
    Updated,
    /// The remote had nothing new.
    UpToDate,
}

/// Brings a repository up to date with its remote before it is analyzed.
pub trait Synchronizer<H>: Send + Sync + 'static {
    fn synchronize(&self, handle: &mut H) -> Result<SyncOutcome>;
}

/// Synchronizer used when `--pull` is off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSync;

impl<H> Synchronizer<H> for NoSync {
    fn synchronize(&self, _handle: &mut H) -> Result<SyncOutcome> {
        Ok(SyncOutcome::UpToDate)
    }
}
