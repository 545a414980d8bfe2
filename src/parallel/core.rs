use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Producer/consumer executor over scoped threads.
///
/// Workers pull items from a bounded channel and push `(index, result)`
/// pairs back; the collector puts results back into input order.
pub struct ParallelExecutor {
    max_workers: usize,
    buffer_size: usize,
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<'a, T, R, F, P> {
    worker_id: usize,
    work_rx: Receiver<(usize, T)>,
    result_tx: Sender<(usize, R)>,
    progress_counter: &'a AtomicUsize,
    total_items: usize,
    processor: &'a F,
    progress_reporter: Option<&'a P>,
}

impl ParallelExecutor {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            max_workers,
            buffer_size: max_workers * 2,
        }
    }

    /// Run `processor` over every item and return the results in input order.
    pub fn execute<T, R, F, P>(&self, work_items: Vec<T>, processor: F, progress_reporter: Option<P>) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(&T, usize) -> R + Sync,
        P: Fn(usize, usize, usize) + Sync, // (current, total, worker_id)
    {
        if work_items.is_empty() {
            return Ok(Vec::new());
        }

        let total_items = work_items.len();
        let actual_workers = self.max_workers.min(total_items);
        let (work_tx, work_rx) = bounded::<(usize, T)>(self.buffer_size);
        let (result_tx, result_rx) = bounded::<(usize, R)>(self.buffer_size);
        let progress_counter = AtomicUsize::new(0);

        crossbeam::thread::scope(|s| {
            for worker_id in 0..actual_workers {
                let ctx = WorkerContext {
                    worker_id,
                    work_rx: work_rx.clone(),
                    result_tx: result_tx.clone(),
                    progress_counter: &progress_counter,
                    total_items,
                    processor: &processor,
                    progress_reporter: progress_reporter.as_ref(),
                };
                s.spawn(move |_| worker_thread(ctx));
            }

            s.spawn(move |_| {
                for item in work_items.into_iter().enumerate() {
                    if work_tx.send(item).is_err() {
                        break; // Workers dropped
                    }
                }
            });

            // Channels close once every worker has drained them
            drop(work_rx);
            drop(result_tx);

            collect_results(result_rx, total_items)
        })
        .map_err(|_| anyhow::anyhow!("Thread panic occurred during parallel execution"))
    }
}

fn worker_thread<T, R, F, P>(ctx: WorkerContext<'_, T, R, F, P>)
where
    F: Fn(&T, usize) -> R,
    P: Fn(usize, usize, usize),
{
    while let Ok((index, item)) = ctx.work_rx.recv() {
        let result = (ctx.processor)(&item, ctx.worker_id);

        if ctx.result_tx.send((index, result)).is_err() {
            break; // Receiver dropped
        }

        let current = ctx.progress_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(reporter) = ctx.progress_reporter {
            reporter(current, ctx.total_items, ctx.worker_id);
        }
    }
}

fn collect_results<R>(result_rx: Receiver<(usize, R)>, total_items: usize) -> Vec<R> {
    let mut slots: Vec<Option<R>> = (0..total_items).map(|_| None).collect();
    while let Ok((index, result)) = result_rx.recv() {
        slots[index] = Some(result);
    }
    slots.into_iter().flatten().collect()
}

/// Sequential execution strategy for comparison/fallback
pub struct SequentialExecutor;

impl SequentialExecutor {
    pub fn execute<T, R, F, P>(work_items: Vec<T>, processor: F, progress_reporter: Option<P>) -> Vec<R>
    where
        F: Fn(&T, usize) -> R,
        P: Fn(usize, usize, usize),
    {
        let total_items = work_items.len();
        let mut results = Vec::with_capacity(total_items);

        for (index, work_item) in work_items.iter().enumerate() {
            results.push(processor(work_item, 0));
            if let Some(reporter) = &progress_reporter {
                reporter(index + 1, total_items, 0);
            }
        }

        results
    }
}

/// Execution strategy enum for choosing between parallel and sequential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Sequential,
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    pub fn execute<T, R, F, P>(&self, work_items: Vec<T>, processor: F, progress_reporter: Option<P>) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(&T, usize) -> R + Sync,
        P: Fn(usize, usize, usize) + Sync,
    {
        match self {
            ExecutionStrategy::Sequential => Ok(SequentialExecutor::execute(
                work_items,
                processor,
                progress_reporter,
            )),
            ExecutionStrategy::Parallel { workers } => {
                ParallelExecutor::new(*workers).execute(work_items, processor, progress_reporter)
            }
        }
    }

    /// Strategy for `workers` threads; a single worker runs inline.
    pub fn for_workers(workers: usize) -> Self {
        if workers > 1 {
            ExecutionStrategy::Parallel { workers }
        } else {
            ExecutionStrategy::Sequential
        }
    }

    /// Worker count from host parallelism and configuration limits.
    ///
    /// ```text
    /// cores * thread_percentage / 100, at least 1,
    /// capped by max_threads_config unless it is 0
    /// ```
    pub fn calculate_optimal_workers(max_threads_config: usize, thread_percentage: u8) -> usize {
        let available_cores = num_cpus::get();
        let workers_by_percentage = std::cmp::max(1, (available_cores * thread_percentage as usize) / 100);

        if max_threads_config > 0 {
            std::cmp::min(max_threads_config, workers_by_percentage)
        } else {
            workers_by_percentage
        }
    }
}
