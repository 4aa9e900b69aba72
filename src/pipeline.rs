use crate::analyze::analyze;
use crate::config::ScanConfig;
use crate::error::{Result, TaskError};
use crate::git::{RepositoryProvider, Synchronizer};
use crate::model::{Directory, PendingDirectory};
use crate::pool::WorkerPool;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Arc;

/// Opens candidate paths one after another and analyzes the repositories
/// on a [`WorkerPool`].
///
/// Paths that fail to open are logged and left out. Directories come back
/// in completion order, empty ones included; ranking is the report's job.
pub struct Pipeline<P, S> {
    provider: Arc<P>,
    synchronizer: Arc<S>,
    config: Arc<ScanConfig>,
    progress: ProgressBar,
}

impl<P, S> Pipeline<P, S>
where
    P: RepositoryProvider,
    S: Synchronizer<P::Handle>,
{
    pub fn new(provider: P, synchronizer: S, config: ScanConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            synchronizer: Arc::new(synchronizer),
            config: Arc::new(config),
            progress: ProgressBar::hidden(),
        }
    }

    /// Ticks `progress` once per input path, analyzed or skipped.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn run(&self, paths: Vec<PathBuf>) -> Result<Vec<Directory>> {
        let pool = WorkerPool::new(self.config.workers);
        tracing::debug!("Scanning {} paths with {} workers", paths.len(), pool.workers());

        let provider = self.provider.clone();
        let skipped = self.progress.clone();
        let source = paths.into_iter().filter_map(move |path| match provider.open(&path) {
            Ok(handle) => Some(PendingDirectory::new(path, handle)),
            Err(e) => {
                tracing::warn!("{e}");
                skipped.inc(1);
                None
            }
        });

        let config = self.config.clone();
        let synchronizer = self.synchronizer.clone();
        let progress = self.progress.clone();
        let directories = pool.run(source, move |pending, worker_id| {
            progress.set_message(pending.path().display().to_string());
            tracing::trace!("worker-{worker_id} analyzing {}", pending.path().display());

            let outcome = analyze(pending, &config, synchronizer.as_ref());
            progress.inc(1);
            outcome.map_err(|e| {
                if config.keep_going {
                    TaskError::Recoverable(e)
                } else {
                    TaskError::Fatal(e)
                }
            })
        });

        self.progress.finish_and_clear();
        directories
    }
}
