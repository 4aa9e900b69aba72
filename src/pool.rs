//! Bounded fan-out/fan-in worker pool.
//!
//! One producer thread drains the work source into a bounded queue, a fixed
//! number of workers pull from it and push outcomes into a result queue, and
//! a supervisor closes the result queue once the producer and every worker
//! have exited. The caller's thread collects.
//!
//! Results come back in completion order, which varies from run to run and
//! with the worker count. Callers that need a stable order must sort.
//!
//! Task failures are tagged by the task itself:
//! - [`TaskError::Recoverable`] is logged and the item is dropped;
//! - [`TaskError::Fatal`] stops dispatching and is returned right away,
//!   without joining workers that are still busy.

use crate::error::{Result, TaskError, WorkedonError};
use crossbeam::channel::{bounded, Receiver, Sender};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

pub type TaskResult<R> = std::result::Result<R, TaskError>;

pub struct WorkerPool {
    workers: usize,
    buffer_size: usize,
}

/// What each worker thread needs, bundled to keep spawn sites short.
struct WorkerContext<T, R, F> {
    worker_id: usize,
    work_rx: Receiver<T>,
    result_tx: Sender<TaskResult<R>>,
    task: Arc<F>,
    abort: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers: workers.get(),
            buffer_size: workers.get() * 2,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `task` over everything `source` yields.
    ///
    /// `source` is consumed on its own thread, so it may do blocking work of
    /// its own (the pipeline opens repositories there).
    pub fn run<T, R, I, F>(&self, source: I, task: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        I: IntoIterator<Item = T> + Send + 'static,
        F: Fn(T, usize) -> TaskResult<R> + Send + Sync + 'static,
    {
        let (work_tx, work_rx) = bounded::<T>(self.buffer_size);
        let (result_tx, result_rx) = bounded::<TaskResult<R>>(self.buffer_size);
        let abort = Arc::new(AtomicBool::new(false));
        let task = Arc::new(task);

        let producer = {
            let abort = abort.clone();
            thread::spawn(move || {
                for item in source {
                    if abort.load(Ordering::Relaxed) || work_tx.send(item).is_err() {
                        break;
                    }
                }
            })
        };

        let mut handles = Vec::with_capacity(self.workers + 1);
        handles.push(producer);
        for worker_id in 0..self.workers {
            let ctx = WorkerContext {
                worker_id,
                work_rx: work_rx.clone(),
                result_tx: result_tx.clone(),
                task: task.clone(),
                abort: abort.clone(),
            };
            handles.push(thread::spawn(move || worker_thread(ctx)));
        }
        drop(work_rx);

        // Supervisor: the result queue closes when its last sender goes away,
        // which is this one, after everything else has finished.
        thread::spawn(move || {
            for handle in handles {
                if let Err(panic) = handle.join() {
                    let _ = result_tx.send(Err(TaskError::Fatal(WorkedonError::WorkerPanicked(
                        panic_message(&panic),
                    ))));
                }
            }
            drop(result_tx);
        });

        let mut results = Vec::new();
        while let Ok(outcome) = result_rx.recv() {
            match outcome {
                Ok(result) => results.push(result),
                Err(TaskError::Recoverable(e)) => tracing::warn!("{e}"),
                Err(TaskError::Fatal(e)) => {
                    abort.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }
        Ok(results)
    }
}

fn worker_thread<T, R, F>(ctx: WorkerContext<T, R, F>)
where
    F: Fn(T, usize) -> TaskResult<R>,
{
    while let Ok(item) = ctx.work_rx.recv() {
        if ctx.abort.load(Ordering::Relaxed) {
            break;
        }
        let outcome = (ctx.task)(item, ctx.worker_id);
        if ctx.result_tx.send(outcome).is_err() {
            break; // Collector gone
        }
    }
    tracing::trace!("worker-{} finished", ctx.worker_id);
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
