use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkedonError>;

#[derive(Error, Debug)]
pub enum WorkedonError {
    #[error("{}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Box<gix::open::Error>,
    },
    #[error("Sync error: {0}")]
    Sync(String),
    #[error("parsing repo {}: {source}", path.display())]
    Analysis {
        path: PathBuf,
        #[source]
        source: Box<WorkedonError>,
    },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid time window: {0}")]
    InvalidWindow(String),
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),
    #[error("Other: {0}")]
    Other(String),
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Head peel error: {0}")]
    HeadPeel(#[from] Box<gix::head::peel::to_commit::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
}

impl WorkedonError {
    pub fn open(path: impl Into<PathBuf>, err: gix::open::Error) -> Self {
        WorkedonError::Open {
            path: path.into(),
            source: Box::new(err),
        }
    }

    pub fn analysis(path: impl Into<PathBuf>, err: WorkedonError) -> Self {
        WorkedonError::Analysis {
            path: path.into(),
            source: Box::new(err),
        }
    }
}

// Manual From implementations for unboxed to boxed conversions
impl From<gix::object::find::existing::Error> for WorkedonError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        WorkedonError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for WorkedonError {
    fn from(err: gix::object::commit::Error) -> Self {
        WorkedonError::Commit(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for WorkedonError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        WorkedonError::RefFind(Box::new(err))
    }
}

impl From<gix::head::peel::to_commit::Error> for WorkedonError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        WorkedonError::HeadPeel(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for WorkedonError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        WorkedonError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for WorkedonError {
    fn from(err: gix::objs::decode::Error) -> Self {
        WorkedonError::ObjectDecode(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for WorkedonError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        WorkedonError::DiffTreeToTree(Box::new(err))
    }
}

/// How a failed pool task affects the rest of the run.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Logged and skipped; other tasks continue.
    #[error("{0}")]
    Recoverable(WorkedonError),
    /// Stops the whole run.
    #[error("{0}")]
    Fatal(WorkedonError),
}
