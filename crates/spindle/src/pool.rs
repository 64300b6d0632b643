//! A small task-queue worker pool used by the ingestion and sort phases.
//!
//! Both phases are embarrassingly parallel batches: each worker pulls the
//! next unprocessed item (a table, or a column) and runs it to completion.
//! The pool joins all workers before returning, so each phase ends on a full
//! barrier.

use crossbeam_channel::unbounded;

use crate::error::{Result, SpindleError};

/// Run `f` over every item on `workers` OS threads, returning the results in
/// arbitrary order. The first error encountered is propagated after the
/// barrier; remaining workers run their items to completion.
pub(crate) fn map_queue<T, R, F>(items: Vec<T>, workers: usize, f: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.max(1).min(items.len());

    let (task_tx, task_rx) = unbounded();
    for item in items {
        task_tx
            .send(item)
            .map_err(|_| SpindleError::Internal("worker task channel closed".to_string()))?;
    }
    drop(task_tx);

    let (result_tx, result_rx) = unbounded();
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let f = &f;
            scope.spawn(move || {
                while let Ok(item) = task_rx.recv() {
                    if result_tx.send(f(item)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut results = Vec::new();
    for outcome in result_rx.iter() {
        results.push(outcome?);
    }
    Ok(results)
}
