//! Concurrent draining of independent pipelines.
//!
//! Parallelism never happens inside one chain: every stage depends on the
//! exact bytes of the one before it. Separate pipelines (for example separate
//! solid blocks of an archive) share nothing, so they can run side by side.

use std::thread;

use crossbeam::channel::bounded;
use log::debug;

use crate::error::Fault;
use crate::pipeline::driver::Pipeline;

/// Drains every pipeline to completion on up to `workers` scoped threads.
///
/// Results come back in input order. Each pipeline's outcome is its own: one
/// faulting has no effect on the others.
pub fn drain_independent(pipelines: Vec<Pipeline>, workers: usize) -> Vec<Result<Vec<u8>, Fault>> {
    let total = pipelines.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);
    debug!("draining {} pipelines on {} workers", total, workers);

    let (job_tx, job_rx) = bounded::<(usize, Pipeline)>(total);
    let (done_tx, done_rx) = bounded::<(usize, Result<Vec<u8>, Fault>)>(total);
    for job in pipelines.into_iter().enumerate() {
        // Capacity equals the job count, so this never blocks.
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = done_tx.clone();
            scope.spawn(move || {
                while let Ok((index, mut pipeline)) = rx.recv() {
                    let result = pipeline.read_to_end();
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(done_tx);

    let mut slots: Vec<Option<Result<Vec<u8>, Fault>>> = (0..total).map(|_| None).collect();
    for (index, result) in done_rx.iter() {
        slots[index] = Some(result);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                Err(Fault::exhausted(format!(
                    "pipeline {} was never drained",
                    index
                )))
            })
        })
        .collect()
}
