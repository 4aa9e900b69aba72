use crate::error::{Result, WorkedonError};
use chrono::{DateTime, Duration, Utc};
use std::num::NonZeroUsize;

pub const DEFAULT_DAYS: u32 = 7;
pub const DEFAULT_WORKERS: usize = 10;

/// How far back in history a scan looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    days: u32,
}

impl TimeWindow {
    pub fn new(days: u32) -> Result<Self> {
        if days == 0 {
            return Err(WorkedonError::InvalidWindow(
                "days must be greater than zero".to_string(),
            ));
        }
        Ok(Self { days })
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Earliest commit time still inside the window, counted back from `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_sub_signed(Duration::days(i64::from(self.days)))
            .ok_or_else(|| WorkedonError::InvalidWindow(format!("{} days before {now}", self.days)))
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self { days: DEFAULT_DAYS }
    }
}

/// Settings for one scan. Built once and shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub window: TimeWindow,
    pub author: Option<String>,
    pub ignore_filename: Option<String>,
    pub by_file: bool,
    pub synchronize: bool,
    pub workers: NonZeroUsize,
    pub keep_going: bool,
}

impl ScanConfig {
    pub fn new() -> Self {
        Self {
            window: TimeWindow::default(),
            author: None,
            ignore_filename: None,
            by_file: false,
            synchronize: false,
            workers: NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN),
            keep_going: false,
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_ignore_filename(mut self, name: impl Into<String>) -> Self {
        self.ignore_filename = Some(name.into());
        self
    }

    pub fn with_by_file(mut self, by_file: bool) -> Self {
        self.by_file = by_file;
        self
    }

    pub fn with_synchronize(mut self, synchronize: bool) -> Self {
        self.synchronize = synchronize;
        self
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}
