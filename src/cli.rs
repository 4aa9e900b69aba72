use crate::config::{ScanConfig, TimeWindow, DEFAULT_DAYS, DEFAULT_WORKERS};
use crate::git::{
    AmbientCredentials, GitProvider, GitPull, GitRepo, NoSync, SshIdentity, Synchronizer,
};
use crate::pipeline::Pipeline;
use crate::report::{Granularity, Report};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Parser, Debug)]
#[command(name = "workedon")]
#[command(about = "What git-tracked stuff have you (or others) worked on")]
#[command(after_help = "EXAMPLE\n  workedon ~/github.com/*/*")]
#[command(version)]
pub struct Cli {
    #[arg(required = true, value_name = "REPO", help = "Repositories to scan")]
    pub repos: Vec<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Only changes by this author")]
    pub author: Option<String>,

    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_DAYS,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Changes made in the last N days"
    )]
    pub days: u32,

    #[arg(long, help = "Changes per file (default is per repo)")]
    pub files: bool,

    #[arg(long, value_name = "FILENAME", help = "Ignore files with this name (e.g. LICENSE)")]
    pub ignore: Option<String>,

    #[arg(long, help = "Pull the repo before parsing its logs")]
    pub pull: bool,

    #[arg(long, value_name = "FILE", requires = "pull", help = "SSH private key used by --pull")]
    pub identity: Option<PathBuf>,

    #[arg(
        long,
        value_name = "N",
        default_value_t = default_workers(),
        help = "Number of repositories analyzed in parallel"
    )]
    pub workers: NonZeroUsize,

    #[arg(long, value_name = "N", help = "Show only the top N rows")]
    pub top: Option<usize>,

    #[arg(long, help = "Skip repositories whose history cannot be read instead of aborting")]
    pub keep_going: bool,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,

    #[arg(short, long, action = ArgAction::Count, help = "More log output (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, conflicts_with = "verbose", help = "No log output")]
    pub quiet: bool,
}

fn default_workers() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN)
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn scan_config(&self) -> Result<ScanConfig> {
        let window = TimeWindow::new(self.days).context("Invalid --days")?;
        let mut config = ScanConfig::new()
            .with_window(window)
            .with_by_file(self.files)
            .with_synchronize(self.pull)
            .with_workers(self.workers)
            .with_keep_going(self.keep_going);
        if let Some(author) = &self.author {
            config = config.with_author(author);
        }
        if let Some(ignore) = &self.ignore {
            config = config.with_ignore_filename(ignore);
        }
        Ok(config)
    }

    pub fn execute(self) -> Result<()> {
        let progress = self.progress_bar();
        setup_logging(self.verbose, self.quiet, progress.clone());
        let config = self.scan_config()?;

        if !self.pull {
            return self.scan(NoSync, config, progress);
        }
        match &self.identity {
            Some(key) => self.scan(GitPull::new(SshIdentity::new(key)), config, progress),
            None => self.scan(GitPull::new(AmbientCredentials), config, progress),
        }
    }

    fn scan<S: Synchronizer<GitRepo>>(
        &self,
        synchronizer: S,
        config: ScanConfig,
        progress: ProgressBar,
    ) -> Result<()> {
        let days = config.window.days();
        let pipeline = Pipeline::new(GitProvider, synchronizer, config).with_progress(progress);

        let directories = pipeline
            .run(self.repos.clone())
            .context("Scan aborted")?;

        let granularity = if pipeline.config().by_file {
            Granularity::File
        } else {
            Granularity::Directory
        };
        let report = Report::build(directories, granularity, self.top);

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if self.json {
            report.write_json(&mut out, days)?;
        } else {
            report.write_table(&mut out)?;
        }
        out.flush()?;
        Ok(())
    }

    fn progress_bar(&self) -> ProgressBar {
        if self.quiet || !Term::stderr().is_term() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(self.repos.len() as u64);
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Standard error writer that hides the progress bar while a log line is
/// written, so warnings never land on the spinner line.
#[derive(Clone)]
struct ProgressAwareStderr {
    progress: ProgressBar,
}

impl Write for ProgressAwareStderr {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.progress.suspend(|| std::io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.progress.suspend(|| std::io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ProgressAwareStderr {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn setup_logging(verbose: u8, quiet: bool, progress: ProgressBar) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,gix=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,gix=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ProgressAwareStderr { progress })
        .with_target(false)
        .without_time()
        .init();
}
