//! Task executors.
//!
//! The pipeline hands an [`Executor`] a batch of independent tasks and gets
//! back one result per task, in submission order. Tasks share a
//! [`Cancellation`] flag: once any task fails, the executor raises it and
//! the remaining tasks stop at their next check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::unbounded;
use lumen_core::{CompileError, PipelineError};

/// A cooperative cancellation flag shared by the tasks of one batch.
#[derive(Debug, Default)]
pub struct Cancellation {
    cancelled: AtomicBool,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(CompileError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), CompileError> {
        if self.is_cancelled() {
            Err(CompileError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One unit of work. Tasks may borrow from the caller's stack.
pub type Task<'env, T> = Box<dyn FnOnce(&Cancellation) -> Result<T, CompileError> + Send + 'env>;

/// Runs a batch of tasks to completion.
pub trait Executor {
    /// Run every task and return their results in submission order.
    ///
    /// Fails with the first task error observed, other than
    /// [`CompileError::Cancelled`]. Results of tasks that completed after
    /// the failure are discarded.
    fn execute<'env, T: Send + 'env>(
        &self,
        tasks: Vec<Task<'env, T>>,
    ) -> Result<Vec<T>, CompileError>;
}

// ============================================================================
// Thread pool
// ============================================================================

/// Runs tasks on a fixed number of scoped worker threads.
#[derive(Debug, Clone, Copy)]
pub struct ThreadPoolExecutor {
    workers: usize,
}

impl ThreadPoolExecutor {
    /// An executor with `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadPoolExecutor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

/// What went wrong in a batch, in reporting priority order.
#[derive(Default)]
struct Failures {
    task: Option<CompileError>,
    panicked: Option<String>,
    spawn: Option<String>,
    cancelled: bool,
}

impl Failures {
    fn into_error(self) -> Option<CompileError> {
        if let Some(err) = self.task {
            return Some(err);
        }
        if let Some(worker) = self.panicked {
            return Some(PipelineError::WorkerPanicked { worker }.into());
        }
        if let Some(message) = self.spawn {
            return Some(PipelineError::WorkerSpawn { message }.into());
        }
        self.cancelled.then_some(CompileError::Cancelled)
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute<'env, T: Send + 'env>(
        &self,
        tasks: Vec<Task<'env, T>>,
    ) -> Result<Vec<T>, CompileError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("ThreadPoolExecutor::execute");

        let count = tasks.len();
        if count == 0 {
            return Ok(Vec::new());
        }
        let workers = self.workers.min(count);
        log::debug!("running {count} tasks on {workers} workers");

        let (job_tx, job_rx) = unbounded::<(usize, Task<'env, T>)>();
        for job in tasks.into_iter().enumerate() {
            job_tx
                .send(job)
                .map_err(|_| CompileError::from(PipelineError::Interrupted))?;
        }
        drop(job_tx);

        let cancellation = Cancellation::new();
        let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
        let mut failures = Failures::default();

        thread::scope(|scope| {
            let (result_tx, result_rx) = unbounded::<(usize, Result<T, CompileError>)>();
            let mut handles = Vec::with_capacity(workers);

            for id in 0..workers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let cancellation = &cancellation;
                let name = format!("lumen-worker-{id}");
                let spawned = thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || {
                        for (index, task) in jobs.iter() {
                            let outcome = match cancellation.check() {
                                Ok(()) => task(cancellation),
                                Err(cancelled) => Err(cancelled),
                            };
                            if matches!(&outcome, Err(e) if !e.is_cancelled()) {
                                cancellation.cancel();
                            }
                            if results.send((index, outcome)).is_err() {
                                break;
                            }
                        }
                    });
                match spawned {
                    Ok(handle) => handles.push((name, handle)),
                    Err(err) => {
                        log::error!("failed to spawn {name}: {err}");
                        failures.spawn = Some(err.to_string());
                        cancellation.cancel();
                        break;
                    }
                }
            }
            drop(result_tx);

            for (index, outcome) in result_rx.iter() {
                match outcome {
                    Ok(value) => {
                        if failures.task.is_none() {
                            slots[index] = Some(value);
                        }
                    }
                    Err(CompileError::Cancelled) => failures.cancelled = true,
                    Err(err) => {
                        if failures.task.is_none() {
                            log::warn!("task {index} failed, cancelling the batch: {err}");
                            cancellation.cancel();
                            failures.task = Some(err);
                        }
                    }
                }
            }

            for (name, handle) in handles {
                if handle.join().is_err() {
                    log::error!("{name} panicked");
                    cancellation.cancel();
                    failures.panicked.get_or_insert(name);
                }
            }
        });

        if let Some(err) = failures.into_error() {
            return Err(err);
        }
        slots
            .into_iter()
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| PipelineError::Interrupted.into())
    }
}

// ============================================================================
// Sequential
// ============================================================================

/// Runs tasks one after another on the calling thread, stopping at the
/// first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn execute<'env, T: Send + 'env>(
        &self,
        tasks: Vec<Task<'env, T>>,
    ) -> Result<Vec<T>, CompileError> {
        let cancellation = Cancellation::new();
        tasks.into_iter().map(|task| task(&cancellation)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::GraphError;
    use std::sync::atomic::AtomicUsize;

    fn missing(name: &str) -> CompileError {
        GraphError::MissingVertex { name: name.into() }.into()
    }

    #[test]
    fn results_keep_submission_order() {
        let tasks: Vec<Task<'_, usize>> = (0..32usize)
            .map(|i| Box::new(move |_: &Cancellation| Ok(i * 2)) as Task<'_, usize>)
            .collect();
        let results = ThreadPoolExecutor::new(4).execute(tasks).unwrap();
        assert_eq!(results, (0..32).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn tasks_may_borrow_from_the_caller() {
        let words = vec!["vertex".to_string(), "fragment".to_string()];
        let tasks: Vec<Task<'_, usize>> = words
            .iter()
            .map(|w| Box::new(move |_: &Cancellation| Ok(w.len())) as Task<'_, usize>)
            .collect();
        assert_eq!(ThreadPoolExecutor::new(2).execute(tasks).unwrap(), [6, 8]);
    }

    #[test]
    fn first_failure_wins_over_cancellation() {
        let _ = env_logger::builder().is_test(true).try_init();
        let tasks: Vec<Task<'_, ()>> = vec![
            Box::new(|_: &Cancellation| Err(missing("demo.k"))),
            Box::new(|cancel: &Cancellation| {
                while !cancel.is_cancelled() {
                    thread::yield_now();
                }
                cancel.check()
            }),
        ];
        let err = ThreadPoolExecutor::new(2).execute(tasks).unwrap_err();
        assert_eq!(err, missing("demo.k"));
    }

    #[test]
    fn cancelled_batch_skips_queued_tasks() {
        let ran = AtomicUsize::new(0);
        let mut tasks: Vec<Task<'_, ()>> =
            vec![Box::new(|_: &Cancellation| Err(missing("demo.k")))];
        for _ in 0..8 {
            tasks.push(Box::new(|_: &Cancellation| {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        assert!(ThreadPoolExecutor::new(1).execute(tasks).is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_task_is_reported() {
        let tasks: Vec<Task<'_, ()>> =
            vec![Box::new(|_: &Cancellation| -> Result<(), CompileError> {
                panic!("boom")
            })];
        let err = ThreadPoolExecutor::new(1).execute(tasks).unwrap_err();
        assert_eq!(
            err,
            CompileError::from(PipelineError::WorkerPanicked {
                worker: "lumen-worker-0".into()
            })
        );
    }

    #[test]
    fn sequential_stops_at_first_failure() {
        let ran = AtomicUsize::new(0);
        let tasks: Vec<Task<'_, ()>> = vec![
            Box::new(|_: &Cancellation| Err(missing("demo.k"))),
            Box::new(|_: &Cancellation| {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ];
        assert!(SequentialExecutor.execute(tasks).is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_batch() {
        let tasks: Vec<Task<'_, ()>> = Vec::new();
        assert!(ThreadPoolExecutor::new(3).execute(tasks).unwrap().is_empty());
    }
}
