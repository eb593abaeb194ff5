//! Bounded-concurrency fan-out with positional results.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tracing::debug;

/// Run `worker` over every input with at most `limit` calls in flight.
///
/// `min(limit, inputs.len())` workers share one cursor; each repeatedly claims
/// the next index and runs the worker for it. `results[i]` always belongs to
/// `inputs[i]` whatever order the calls finish in, and a failed item never stops
/// its siblings. A `limit` of zero is treated as one.
pub async fn map_concurrent<T, R, E, F, Fut>(inputs: &[T], limit: usize, worker: F) -> Vec<Result<R, E>>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let workers = limit.max(1).min(inputs.len());
    debug!(items = inputs.len(), workers, "fan-out start");

    let cursor = AtomicUsize::new(0);
    let runners = (0..workers).map(|_| {
        let cursor = &cursor;
        let worker = &worker;
        async move {
            let mut done = Vec::new();
            loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(input) = inputs.get(index) else {
                    break;
                };
                done.push((index, worker(input).await));
            }
            done
        }
    });

    let mut slots: Vec<Option<Result<R, E>>> = (0..inputs.len()).map(|_| None).collect();
    for (index, result) in join_all(runners).await.into_iter().flatten() {
        slots[index] = Some(result);
    }
    // every index below len is claimed by exactly one runner
    slots.into_iter().flatten().collect()
}
